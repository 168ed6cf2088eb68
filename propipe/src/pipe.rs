//! The pipe: one chat turn in, one annotated response out.
//!
//! # Example
//!
//! ```rust,ignore
//! use propipe::prelude::*;
//!
//! let pipe = Pipe::new(PipeConfig::from_env()?)?;
//! let request = TurnRequest::new("o3-pro", vec![Message::user("Prove it.")]);
//!
//! let outcome = pipe.process_turn(&request, ConversationTotals::new()).await?;
//! println!("{}", outcome.render());
//! let totals = outcome.totals; // feed into the next turn
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accounting::{ConversationTotals, DisplayOptions, Summary, UsageAccountant};
use crate::config::PipeConfig;
use crate::conversation::{ConversationStore, conversation_id};
use crate::error::{ConfigError, Result};
use crate::keys::{KeyRotator, SharedCredentialSource};
use crate::llms::OpenAI;
use crate::message::{Message, MessageRole};
use crate::pricing::PriceTable;
use crate::responses::{ResponsesRequest, ResponsesResponse, SharedResponsesProvider};
use crate::usage::{Usage, UsageRecord};

/// Text used when a response carries no readable output.
pub const NO_TEXT_PLACEHOLDER: &str = "No response text found in the API response.";

/// A model the pipe serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model id sent to the API.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One inbound chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Model id, optionally qualified by the host (`pipe.o3-pro`).
    pub model: String,
    /// Full conversation history, newest last.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl TurnRequest {
    /// Create a request.
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }
}

/// Everything produced by a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Resolved model id.
    pub model: String,
    /// Position of this turn in the conversation, starting at 1.
    pub message_number: u64,
    /// Model output, or [`NO_TEXT_PLACEHOLDER`].
    pub text: String,
    /// Truncation and tool notes, in display order.
    pub notes: Vec<String>,
    /// Usage as billed.
    pub usage: UsageRecord,
    /// Whether the provider reported usage at all.
    pub usage_reported: bool,
    /// Statistics for this turn.
    pub summary: Summary,
    /// Totals including this turn.
    pub totals: ConversationTotals,
}

impl TurnOutcome {
    /// Response text followed by notes and the statistics block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.text.clone();
        for note in &self.notes {
            out.push_str("\n\n");
            out.push_str(note);
        }
        if let Some(stats) = self.summary.text() {
            out.push_str("\n\n");
            out.push_str(&stats);
        }
        out
    }
}

/// Forwards chat turns to the model and accounts for their cost.
#[derive(Debug, Clone)]
pub struct Pipe {
    config: Arc<PipeConfig>,
    credentials: SharedCredentialSource,
    provider: SharedResponsesProvider,
    accountant: UsageAccountant,
}

impl Pipe {
    /// Create a pipe talking to OpenAI with a rotator over the configured keys.
    ///
    /// An empty key list is accepted here; it is reported on the first turn.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid setting, or an error if
    /// the HTTP client cannot be built.
    pub fn new(config: PipeConfig) -> Result<Self> {
        config.check_settings()?;
        let provider = Arc::new(OpenAI::from_config(&config)?);
        let credentials = Arc::new(KeyRotator::new(config.api_keys.clone()));
        Self::with_parts(config, credentials, provider)
    }

    /// Create a pipe from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an invalid setting.
    pub fn with_parts(
        config: PipeConfig,
        credentials: SharedCredentialSource,
        provider: SharedResponsesProvider,
    ) -> Result<Self> {
        config.check_settings()?;
        let display = DisplayOptions {
            token_stats: config.show_token_stats,
            cumulative_cost: config.show_cumulative_cost,
        };
        Ok(Self {
            config: Arc::new(config),
            credentials,
            provider,
            accountant: UsageAccountant::new(PriceTable::default(), display),
        })
    }

    /// Replace the price table; its entries become the supported models.
    #[must_use]
    pub fn with_price_table(mut self, prices: PriceTable) -> Self {
        self.accountant = UsageAccountant::new(prices, self.accountant.display());
        self
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Accountant in use.
    #[must_use]
    pub const fn accountant(&self) -> &UsageAccountant {
        &self.accountant
    }

    /// Models served, with display names.
    #[must_use]
    pub fn models(&self) -> Vec<ModelInfo> {
        self.accountant
            .prices()
            .model_ids()
            .map(|id| ModelInfo {
                id: id.to_owned(),
                name: format!("{}{id}", self.config.name_prefix),
            })
            .collect()
    }

    /// Strip a host qualifier and check the model is served.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModel`] for anything not priced.
    pub fn resolve_model(&self, requested: &str) -> Result<String> {
        let id = requested
            .split_once('.')
            .map_or(requested, |(_, rest)| rest)
            .trim();
        let prices = self.accountant.prices();
        if prices.contains(id) {
            Ok(id.to_owned())
        } else {
            Err(ConfigError::unknown_model(id, prices.model_ids()).into())
        }
    }

    /// Run one turn against `totals` and return the outcome with new totals.
    ///
    /// On error nothing is accounted; keep using the `totals` passed in.
    ///
    /// # Errors
    ///
    /// Configuration errors (unknown model, no keys) are raised before any
    /// request is sent. Transport, timeout and status errors come from the
    /// provider unchanged.
    pub async fn process_turn(
        &self,
        request: &TurnRequest,
        totals: ConversationTotals,
    ) -> Result<TurnOutcome> {
        let model = self.resolve_model(&request.model)?;
        let api_key = self.credentials.next_credential()?;
        let message_number = totals.next_message_number();

        let body = ResponsesRequest::new(
            model.clone(),
            &request.messages,
            self.config.thinking_effort,
            self.config.effective_max_output_tokens(),
        );

        info!(
            model = %model,
            message_number,
            effort = %self.config.thinking_effort,
            provider = self.provider.provider_name(),
            "dispatching turn"
        );
        let response = self.provider.create_response(&api_key, &body).await?;
        self.log_response(&response);

        let usage_reported = response.usage.is_some();
        if !usage_reported {
            warn!(model = %model, "response carried no usage; accounting zero tokens");
        }
        let usage = UsageRecord::from_usage(response.usage.as_ref());
        let cached_tokens = response.usage.as_ref().map_or(0, Usage::cached_tokens);
        let cost = self.accountant.compute_cost(&usage, &model)?;
        let (totals, summary) = self.accountant.record_turn(totals, usage, cost);

        info!(
            model = %model,
            message_number,
            cached_tokens,
            cost = %cost,
            total_cost = %totals.cost,
            "turn completed"
        );

        Ok(TurnOutcome {
            text: response
                .text()
                .unwrap_or_else(|| NO_TEXT_PLACEHOLDER.to_owned()),
            notes: self.notes_for(&response),
            model,
            message_number,
            usage,
            usage_reported,
            summary,
            totals,
        })
    }

    /// Run one turn keyed by conversation id in `store`.
    ///
    /// # Errors
    ///
    /// Same as [`Pipe::process_turn`]; the stored totals are left untouched
    /// on error.
    pub async fn handle(
        &self,
        request: &TurnRequest,
        user_id: Option<&str>,
        store: &ConversationStore,
    ) -> Result<TurnOutcome> {
        let conv_id = conversation_id(&request.messages, user_id);
        if self.config.debug_mode {
            let user_messages = request
                .messages
                .iter()
                .filter(|m| m.role == MessageRole::User)
                .count();
            info!(conversation = %conv_id, user_messages, "resolved conversation");
        }

        let totals = store.get(&conv_id).await;
        let outcome = self.process_turn(request, totals).await?;
        store.put(conv_id, outcome.totals).await;
        Ok(outcome)
    }

    fn notes_for(&self, response: &ResponsesResponse) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(reason) = response.incomplete_reason() {
            let mut note = format!("⚠️ Note: Response was truncated due to: {reason}");
            if reason == "max_output_tokens" {
                note.push_str(&format!(
                    "\nConsider increasing MAX_OUTPUT_TOKENS (currently set to {})",
                    self.config.max_output_tokens
                ));
            }
            notes.push(note);
        }
        let tools = response.tools_used();
        if !tools.is_empty() {
            notes.push(format!("🔧 Tools used: {}", tools.join(", ")));
        }
        notes
    }

    fn log_response(&self, response: &ResponsesResponse) {
        if self.config.debug_mode {
            info!(
                id = response.id.as_deref().unwrap_or("-"),
                status = response.status(),
                output_items = response.output.len(),
                has_usage = response.usage.is_some(),
                "response received"
            );
        } else {
            debug!(status = response.status(), "response received");
        }
    }
}
