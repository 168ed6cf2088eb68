//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use propipe::prelude::*;
//! ```

pub use crate::accounting::{ConversationTotals, DisplayOptions, Summary, UsageAccountant};
pub use crate::config::{PipeConfig, ReasoningEffort};
pub use crate::conversation::{ConversationStore, conversation_id};
pub use crate::error::{ConfigError, Error, LlmError, Result};
pub use crate::keys::{CredentialSource, KeyRotator, SharedCredentialSource};
pub use crate::llms::OpenAI;
pub use crate::message::{ContentPart, ImageUrl, Message, MessageContent, MessageRole};
pub use crate::pipe::{ModelInfo, Pipe, TurnOutcome, TurnRequest};
pub use crate::pricing::{Cost, ModelPricing, PriceTable};
pub use crate::responses::{
    ResponsesProvider, ResponsesRequest, ResponsesResponse, SharedResponsesProvider,
};
pub use crate::usage::{Usage, UsageRecord};
