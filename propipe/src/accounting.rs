//! Per-message cost and conversation totals.
//!
//! [`ConversationTotals`] is a plain value: callers pass it into
//! [`UsageAccountant::record_turn`] and keep what comes back. Nothing here
//! touches session state.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::pricing::{Cost, PriceTable};
use crate::usage::UsageRecord;

/// Which statistics blocks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Render the this-message block.
    pub token_stats: bool,
    /// Render the conversation totals block.
    pub cumulative_cost: bool,
}

impl DisplayOptions {
    /// Both blocks off.
    pub const HIDDEN: Self = Self {
        token_stats: false,
        cumulative_cost: false,
    };

    /// Whether anything is rendered at all.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.token_stats || self.cumulative_cost
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            token_stats: true,
            cumulative_cost: true,
        }
    }
}

/// Running totals for one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationTotals {
    /// Messages accounted so far.
    pub message_count: u64,
    /// Cumulative input tokens.
    pub input_tokens: u64,
    /// Cumulative output tokens, reasoning included.
    pub output_tokens: u64,
    /// Cumulative cost.
    pub cost: Cost,
}

impl ConversationTotals {
    /// Totals before the first turn.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            message_count: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost: Cost::ZERO,
        }
    }

    /// Fold one turn in.
    #[must_use]
    pub fn add_turn(self, usage: &UsageRecord, cost: Cost) -> Self {
        Self {
            message_count: self.message_count + 1,
            input_tokens: self.input_tokens + usage.input_tokens,
            output_tokens: self.output_tokens + usage.billable_output_tokens(),
            cost: self.cost + cost,
        }
    }

    /// Number the next turn will carry.
    #[must_use]
    pub const fn next_message_number(&self) -> u64 {
        self.message_count + 1
    }
}

/// Computes costs and folds turns into conversation totals.
#[derive(Debug, Clone, Default)]
pub struct UsageAccountant {
    prices: PriceTable,
    display: DisplayOptions,
}

impl UsageAccountant {
    /// Create an accountant.
    #[must_use]
    pub const fn new(prices: PriceTable, display: DisplayOptions) -> Self {
        Self { prices, display }
    }

    /// The price table in use.
    #[must_use]
    pub const fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// The display switches in use.
    #[must_use]
    pub const fn display(&self) -> DisplayOptions {
        self.display
    }

    /// Cost of one request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModel`] for a model without prices.
    pub fn compute_cost(&self, usage: &UsageRecord, model: &str) -> Result<Cost, ConfigError> {
        self.prices.compute_cost(usage, model)
    }

    /// Fold a turn into `totals` and build its summary.
    ///
    /// Accumulation happens whatever the display switches say.
    #[must_use]
    pub fn record_turn(
        &self,
        totals: ConversationTotals,
        usage: UsageRecord,
        cost: Cost,
    ) -> (ConversationTotals, Summary) {
        let totals = totals.add_turn(&usage, cost);
        debug!(
            messages = totals.message_count,
            message_cost = %cost,
            total_cost = %totals.cost,
            "updated conversation totals"
        );
        let summary = Summary {
            usage,
            cost,
            totals,
            display: self.display,
        };
        (totals, summary)
    }
}

/// Rendered statistics for one turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// This message's usage.
    pub usage: UsageRecord,
    /// This message's cost.
    pub cost: Cost,
    /// Totals including this message.
    pub totals: ConversationTotals,
    /// Switches applied when rendering.
    pub display: DisplayOptions,
}

impl Summary {
    /// Whether rendering yields no text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.display.any()
    }

    /// Rendered text, `None` when both blocks are switched off.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }

    fn write_message_block(&self, f: &mut impl Write) -> fmt::Result {
        let u = &self.usage;
        writeln!(f, "📊 Token Usage (This Message):")?;
        writeln!(f, "- Input: {} tokens", group_thousands(u.input_tokens))?;
        writeln!(f, "- Reasoning: {} tokens", group_thousands(u.reasoning_tokens))?;
        writeln!(f, "- Output: {} tokens", group_thousands(u.output_tokens))?;
        writeln!(f, "- Total: {} tokens", group_thousands(u.total_tokens()))?;
        write!(f, "- Cost for this message: {}", self.cost)
    }

    fn write_totals_block(&self, f: &mut impl Write) -> fmt::Result {
        let t = &self.totals;
        writeln!(f, "💰 Conversation Totals:")?;
        writeln!(f, "- Messages: {}", t.message_count)?;
        writeln!(f, "- Total Input: {} tokens", group_thousands(t.input_tokens))?;
        writeln!(f, "- Total Output: {} tokens", group_thousands(t.output_tokens))?;
        write!(f, "- Total Cost: {}", t.cost)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display.token_stats {
            self.write_message_block(f)?;
        }
        if self.display.token_stats && self.display.cumulative_cost {
            f.write_str("\n\n")?;
        }
        if self.display.cumulative_cost {
            self.write_totals_block(f)?;
        }
        Ok(())
    }
}

/// Formats `1234567` as `1,234,567`.
#[must_use]
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn accountant(display: DisplayOptions) -> UsageAccountant {
        UsageAccountant::new(PriceTable::default(), display)
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(2691), "2,691");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn three_turns_accumulate() {
        let acct = accountant(DisplayOptions::default());
        let mut totals = ConversationTotals::new();
        for cost in [0.10, 0.20, 0.05] {
            let (next, _) = acct.record_turn(totals, UsageRecord::default(), Cost(cost));
            totals = next;
        }
        assert_eq!(totals.message_count, 3);
        assert_eq!(totals.cost.to_string(), "$0.3500");
        assert_eq!(totals.next_message_number(), 4);
    }

    #[test]
    fn totals_include_reasoning_in_output() {
        let totals = ConversationTotals::new().add_turn(&UsageRecord::new(10, 5, 20), Cost(0.0));
        assert_eq!(totals.input_tokens, 10);
        assert_eq!(totals.output_tokens, 25);
    }

    #[test]
    fn renders_both_blocks() {
        let summary = Summary {
            usage: UsageRecord::new(1234, 567, 890),
            cost: Cost(0.1234),
            totals: ConversationTotals {
                message_count: 3,
                input_tokens: 3456,
                output_tokens: 2345,
                cost: Cost(0.3456),
            },
            display: DisplayOptions::default(),
        };
        let expected = "📊 Token Usage (This Message):\n\
                        - Input: 1,234 tokens\n\
                        - Reasoning: 567 tokens\n\
                        - Output: 890 tokens\n\
                        - Total: 2,691 tokens\n\
                        - Cost for this message: $0.1234\n\
                        \n\
                        💰 Conversation Totals:\n\
                        - Messages: 3\n\
                        - Total Input: 3,456 tokens\n\
                        - Total Output: 2,345 tokens\n\
                        - Total Cost: $0.3456";
        assert_eq!(summary.to_string(), expected);
    }

    #[test]
    fn gating_is_independent() {
        let acct = accountant(DisplayOptions {
            token_stats: false,
            cumulative_cost: true,
        });
        let (_, summary) = acct.record_turn(
            ConversationTotals::new(),
            UsageRecord::new(1, 0, 1),
            Cost(0.5),
        );
        let text = summary.text().unwrap();
        assert!(text.starts_with("💰 Conversation Totals:"));
        assert!(!text.contains("This Message"));

        let acct = accountant(DisplayOptions {
            token_stats: true,
            cumulative_cost: false,
        });
        let (_, summary) = acct.record_turn(
            ConversationTotals::new(),
            UsageRecord::new(1, 0, 1),
            Cost(0.5),
        );
        let text = summary.text().unwrap();
        assert!(text.ends_with("- Cost for this message: $0.5000"));
        assert!(!text.contains("Conversation Totals"));
    }

    #[test]
    fn hidden_display_still_accumulates() {
        let acct = accountant(DisplayOptions::HIDDEN);
        let (totals, summary) = acct.record_turn(
            ConversationTotals::new(),
            UsageRecord::new(100, 0, 50),
            Cost(0.25),
        );
        assert!(summary.text().is_none());
        assert_eq!(summary.to_string(), "");
        assert_eq!(totals.message_count, 1);
        assert_eq!(totals.cost, Cost(0.25));
    }
}
