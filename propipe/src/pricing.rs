//! Static model prices and cost computation.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::usage::UsageRecord;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// USD rates per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Input rate.
    pub input: f64,
    /// Output rate, also applied to reasoning tokens.
    pub output: f64,
}

impl ModelPricing {
    /// Create a pricing entry.
    #[must_use]
    pub const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Cost of a single request at these rates.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, usage: &UsageRecord) -> Cost {
        let input = usage.input_tokens as f64 * self.input / TOKENS_PER_MILLION;
        let output = usage.billable_output_tokens() as f64 * self.output / TOKENS_PER_MILLION;
        Cost(input + output)
    }
}

/// A USD amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(pub f64);

impl Cost {
    /// Zero dollars.
    pub const ZERO: Self = Self(0.0);

    /// Raw dollar value.
    #[must_use]
    pub const fn usd(self) -> f64 {
        self.0
    }
}

impl Add for Cost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Formats as `$0.1234`.
impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.4}", self.0)
    }
}

/// Read-only map from model id to rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    models: BTreeMap<String, ModelPricing>,
}

impl PriceTable {
    /// Published `o1-pro` rates.
    pub const O1_PRO: ModelPricing = ModelPricing::new(150.0, 600.0);
    /// Published `o3-pro` rates.
    pub const O3_PRO: ModelPricing = ModelPricing::new(20.0, 80.0);

    /// Create a table from explicit entries.
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ModelPricing)>,
        S: Into<String>,
    {
        Self {
            models: entries.into_iter().map(|(id, p)| (id.into(), p)).collect(),
        }
    }

    /// Rates for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModel`] when the table has no entry.
    pub fn get(&self, model: &str) -> Result<ModelPricing, ConfigError> {
        self.models
            .get(model)
            .copied()
            .ok_or_else(|| ConfigError::unknown_model(model, self.model_ids()))
    }

    /// Whether the table prices `model`.
    #[must_use]
    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Priced model ids in sorted order.
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Cost of `usage` on `model`.
    ///
    /// `input * input_rate / 1e6 + (output + reasoning) * output_rate / 1e6`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModel`] without computing anything when
    /// the model is not priced.
    pub fn compute_cost(&self, usage: &UsageRecord, model: &str) -> Result<Cost, ConfigError> {
        Ok(self.get(model)?.cost(usage))
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new([("o1-pro", Self::O1_PRO), ("o3-pro", Self::O3_PRO)])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn o1_pro_output_million() {
        let table = PriceTable::default();
        let cost = table
            .compute_cost(&UsageRecord::new(0, 0, 1_000_000), "o1-pro")
            .unwrap();
        assert_eq!(cost.to_string(), "$600.0000");
    }

    #[test]
    fn o3_pro_input_million_uses_input_rate() {
        let table = PriceTable::default();
        let cost = table
            .compute_cost(&UsageRecord::new(1_000_000, 0, 0), "o3-pro")
            .unwrap();
        assert!((cost.usd() - 20.0).abs() < f64::EPSILON);
        assert_eq!(cost.to_string(), "$20.0000");
    }

    #[test]
    fn reasoning_billed_at_output_rate() {
        let table = PriceTable::default();
        let reasoning = table
            .compute_cost(&UsageRecord::new(0, 1000, 0), "o3-pro")
            .unwrap();
        let output = table
            .compute_cost(&UsageRecord::new(0, 0, 1000), "o3-pro")
            .unwrap();
        assert_eq!(reasoning, output);
        assert_eq!(reasoning.to_string(), "$0.0800");
    }

    #[test]
    fn doubling_input_doubles_cost() {
        let table = PriceTable::default();
        for model in ["o1-pro", "o3-pro"] {
            for tokens in [1, 777, 1000, 123_456] {
                let single = table
                    .compute_cost(&UsageRecord::new(tokens, 0, 0), model)
                    .unwrap();
                let double = table
                    .compute_cost(&UsageRecord::new(tokens * 2, 0, 0), model)
                    .unwrap();
                assert_eq!(double.usd(), single.usd() * 2.0, "{model} {tokens}");
            }
        }
    }

    #[test]
    fn mixed_usage() {
        // 1234 * 150/1e6 + (890 + 567) * 600/1e6 = 0.1851 + 0.8742
        let cost = PriceTable::default()
            .compute_cost(&UsageRecord::new(1234, 567, 890), "o1-pro")
            .unwrap();
        assert_eq!(cost.to_string(), "$1.0593");
    }

    #[test]
    fn unknown_model_is_config_error() {
        let err = PriceTable::default()
            .compute_cost(&UsageRecord::new(1, 1, 1), "gpt-4o")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel { ref model, .. } if model == "gpt-4o"));
    }

    #[test]
    fn costs_sum() {
        let total: Cost = [Cost(0.10), Cost(0.20), Cost(0.05)].into_iter().sum();
        assert_eq!(total.to_string(), "$0.3500");
    }

    #[test]
    fn model_ids_sorted() {
        let table = PriceTable::default();
        let ids: Vec<&str> = table.model_ids().collect();
        assert_eq!(ids, vec!["o1-pro", "o3-pro"]);
    }
}
