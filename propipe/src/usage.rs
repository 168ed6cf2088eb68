//! Token usage reported by the Responses API.
//!
//! [`Usage`] mirrors the wire object and tolerates missing fields. The
//! accountant works on the flattened [`UsageRecord`].
//!
//! # Wire shape
//!
//! ```json
//! {
//!     "input_tokens": 100,
//!     "output_tokens": 50,
//!     "total_tokens": 150,
//!     "input_tokens_details": { "cached_tokens": 0 },
//!     "output_tokens_details": { "reasoning_tokens": 32 }
//! }
//! ```
//!
//! Chat Completions names (`prompt_tokens`, `completion_tokens`,
//! `*_tokens_details`) are accepted as aliases.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Breakdown of input tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTokensDetails {
    /// Cached tokens reused from a previous request.
    #[serde(default)]
    pub cached_tokens: u64,
}

/// Breakdown of output tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    /// Hidden reasoning tokens.
    #[serde(default)]
    pub reasoning_tokens: u64,
}

/// Usage object as returned by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the input.
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u64,

    /// Tokens in the visible output.
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u64,

    /// Total as reported by the provider.
    #[serde(default)]
    pub total_tokens: u64,

    /// Input breakdown.
    #[serde(
        default,
        alias = "prompt_tokens_details",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_tokens_details: Option<InputTokensDetails>,

    /// Output breakdown.
    #[serde(
        default,
        alias = "completion_tokens_details",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

impl Usage {
    /// Create a usage object without details.
    #[must_use]
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            input_tokens_details: None,
            output_tokens_details: None,
        }
    }

    /// Set reasoning tokens.
    #[must_use]
    pub const fn with_reasoning(mut self, reasoning: u64) -> Self {
        self.output_tokens_details = Some(OutputTokensDetails {
            reasoning_tokens: reasoning,
        });
        self
    }

    /// Reasoning tokens, zero when not reported.
    #[must_use]
    pub const fn reasoning_tokens(&self) -> u64 {
        match &self.output_tokens_details {
            Some(d) => d.reasoning_tokens,
            None => 0,
        }
    }

    /// Cached input tokens, zero when not reported.
    #[must_use]
    pub const fn cached_tokens(&self) -> u64 {
        match &self.input_tokens_details {
            Some(d) => d.cached_tokens,
            None => 0,
        }
    }
}

/// Per-request counts used for billing.
///
/// Reasoning tokens are kept apart from output tokens for display but are
/// billed at the output rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Input tokens.
    pub input_tokens: u64,
    /// Reasoning tokens.
    pub reasoning_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
}

impl UsageRecord {
    /// Create a record.
    #[must_use]
    pub const fn new(input_tokens: u64, reasoning_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            reasoning_tokens,
            output_tokens,
        }
    }

    /// Tokens billed at the output rate.
    #[must_use]
    pub const fn billable_output_tokens(&self) -> u64 {
        self.output_tokens + self.reasoning_tokens
    }

    /// Input, reasoning and output combined.
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens + self.reasoning_tokens + self.output_tokens
    }

    /// Build a record from an optional provider usage; absent means zero.
    #[must_use]
    pub fn from_usage(usage: Option<&Usage>) -> Self {
        usage.map(Self::from).unwrap_or_default()
    }
}

impl From<&Usage> for UsageRecord {
    fn from(usage: &Usage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            reasoning_tokens: usage.reasoning_tokens(),
            output_tokens: usage.output_tokens,
        }
    }
}

impl Add for UsageRecord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens + rhs.input_tokens,
            reasoning_tokens: self.reasoning_tokens + rhs.reasoning_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
        }
    }
}

impl AddAssign for UsageRecord {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for UsageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Usage(in: {}, reasoning: {}, out: {})",
            self.input_tokens, self.reasoning_tokens, self.output_tokens
        )
    }
}
