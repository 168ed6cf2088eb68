//! propipe - cost-annotating client for OpenAI's `o1-pro` and `o3-pro`.
//!
//! A [`Pipe`] forwards one chat turn at a time to the Responses API, picking
//! API keys round-robin, and appends per-message and per-conversation token
//! and cost statistics to the answer.

pub mod accounting;
pub mod config;
pub mod conversation;
pub mod error;
pub mod keys;
pub mod llms;
pub mod message;
pub mod pipe;
pub mod prelude;
pub mod pricing;
pub mod responses;
pub mod usage;

pub use config::PipeConfig;
pub use error::{ConfigError, Error, LlmError, Result};
pub use pipe::Pipe;
