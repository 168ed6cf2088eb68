//! Model provider backends.
//!
//! - [`openai`] - OpenAI Responses API

pub mod error;
pub mod openai;

pub use error::LlmError;
pub use openai::OpenAI;
