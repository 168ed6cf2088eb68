//! Responses API request/response types and the provider trait.
//!
//! This module provides:
//! - [`ResponsesRequest`]: body of `POST /responses`
//! - [`ResponsesResponse`]: the non-streamed reply
//! - [`ResponsesProvider`]: the dispatch seam the pipe calls through

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ReasoningEffort;
use crate::error::Result;
use crate::message::{ContentPart, Message, MessageContent, MessageRole};
use crate::usage::Usage;

/// Reasoning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    /// Effort level.
    pub effort: ReasoningEffort,
}

/// One content element of an input item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    /// Text supplied by the user or system.
    InputText {
        /// The text.
        text: String,
    },
    /// Image supplied by the user.
    InputImage {
        /// http(s) or data URL.
        image_url: String,
    },
    /// Text previously produced by the assistant.
    OutputText {
        /// The text.
        text: String,
    },
}

/// One conversation item sent as input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputItem {
    /// Role of the author.
    pub role: MessageRole,
    /// Content elements.
    pub content: Vec<InputContent>,
}

impl InputItem {
    /// Convert a host message; tool messages have no counterpart.
    #[must_use]
    pub fn from_message(message: &Message) -> Option<Self> {
        let content = match (message.role, &message.content) {
            (MessageRole::User, MessageContent::Parts(parts)) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => InputContent::InputText { text: text.clone() },
                    ContentPart::ImageUrl { image_url } => InputContent::InputImage {
                        image_url: image_url.url.clone(),
                    },
                })
                .collect(),
            (MessageRole::User | MessageRole::System, content) => vec![InputContent::InputText {
                text: content.plain_text(),
            }],
            (MessageRole::Assistant, content) => vec![InputContent::OutputText {
                text: content.plain_text(),
            }],
            (MessageRole::Tool, _) => return None,
        };
        Some(Self {
            role: message.role,
            content,
        })
    }
}

/// Body of a non-streaming `POST /responses` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsesRequest {
    /// Model id.
    pub model: String,
    /// Conversation so far.
    pub input: Vec<InputItem>,
    /// Reasoning parameters.
    pub reasoning: Reasoning,
    /// Cap on output tokens, reasoning included.
    pub max_output_tokens: u32,
}

impl ResponsesRequest {
    /// Build a request from host messages.
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        messages: &[Message],
        effort: ReasoningEffort,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            input: messages.iter().filter_map(InputItem::from_message).collect(),
            reasoning: Reasoning { effort },
            max_output_tokens,
        }
    }
}

/// Why a response stopped early.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteDetails {
    /// Reason such as `max_output_tokens`.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A completed, non-streamed response.
///
/// Output items are kept as raw JSON because their shape depends on the item
/// type; [`ResponsesResponse::text`] knows how to read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsesResponse {
    /// Response id.
    #[serde(default)]
    pub id: Option<String>,
    /// Model that served the request.
    #[serde(default)]
    pub model: Option<String>,
    /// `completed`, `incomplete`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// Convenience concatenation some SDKs and proxies add.
    #[serde(default)]
    pub output_text: Option<String>,
    /// Output items.
    #[serde(default)]
    pub output: Vec<Value>,
    /// Token usage.
    #[serde(default)]
    pub usage: Option<Usage>,
    /// Set when `status` is `incomplete`.
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl ResponsesResponse {
    /// Item types reported as tools.
    pub const TOOL_ITEM_TYPES: [&'static str; 2] = ["file_search", "function"];

    /// Status, `completed` when absent.
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("completed")
    }

    /// Whether the model stopped before finishing.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.status() == "incomplete"
    }

    /// Reason for an incomplete response, `Unknown` when not given.
    #[must_use]
    pub fn incomplete_reason(&self) -> Option<&str> {
        self.is_incomplete().then(|| {
            self.incomplete_details
                .as_ref()
                .and_then(|d| d.reason.as_deref())
                .unwrap_or("Unknown")
        })
    }

    /// Response text.
    ///
    /// Prefers a non-empty top-level `output_text`, otherwise collects text
    /// from the output items. `None` when neither yields anything.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        if let Some(text) = self.output_text.as_deref().filter(|t| !t.is_empty()) {
            return Some(text.to_owned());
        }
        let joined = extract_output_text(&self.output);
        (!joined.is_empty()).then_some(joined)
    }

    /// Distinct tool item types, in first-seen order.
    #[must_use]
    pub fn tools_used(&self) -> Vec<&str> {
        let mut tools: Vec<&str> = Vec::new();
        for kind in self
            .output
            .iter()
            .filter_map(|item| item.get("type").and_then(Value::as_str))
            .filter(|kind| Self::TOOL_ITEM_TYPES.iter().any(|t| t == kind))
        {
            if !tools.contains(&kind) {
                tools.push(kind);
            }
        }
        tools
    }
}

/// Joins every text fragment found in `items` with newlines.
fn extract_output_text(items: &[Value]) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for item in items {
        match item {
            Value::String(s) => parts.push(s),
            Value::Object(obj) => {
                let is_assistant_message = obj.get("type").and_then(Value::as_str)
                    == Some("message")
                    && obj.get("role").and_then(Value::as_str) == Some("assistant");

                if is_assistant_message {
                    let content = obj.get("content").and_then(Value::as_array);
                    parts.extend(
                        content
                            .into_iter()
                            .flatten()
                            .filter(|c| c.get("type").and_then(Value::as_str) == Some("output_text"))
                            .filter_map(|c| c.get("text").and_then(Value::as_str))
                            .filter(|t| !t.is_empty()),
                    );
                } else if let Some(text) = obj.get("text").and_then(Value::as_str) {
                    parts.push(text);
                } else {
                    match obj.get("content") {
                        Some(Value::String(s)) => parts.push(s),
                        Some(Value::Array(list)) => parts.extend(
                            list.iter()
                                .filter_map(|c| c.get("text").and_then(Value::as_str)),
                        ),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    parts.join("\n")
}

/// Dispatches a request to a model endpoint.
///
/// Calls are synchronous from the caller's point of view: the full response,
/// usage included, is available when the future resolves. Implementations do
/// not retry.
#[async_trait]
pub trait ResponsesProvider: Send + Sync + fmt::Debug {
    /// Send `request` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`](crate::LlmError) on transport failure, timeout or
    /// a non-success status.
    async fn create_response(
        &self,
        api_key: &str,
        request: &ResponsesRequest,
    ) -> Result<ResponsesResponse>;

    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Shared provider.
pub type SharedResponsesProvider = Arc<dyn ResponsesProvider>;
