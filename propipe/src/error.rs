//! Unified error types for propipe.
//!
//! Two families matter to callers:
//! - [`ConfigError`]: raised before any request is attempted
//! - [`LlmError`]: raised by the outbound call itself

pub use crate::llms::error::LlmError;

/// Result type alias for propipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration problem; no request was attempted.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider call failed.
    #[error("{0}")]
    Llm(#[from] LlmError),
}

impl Error {
    /// Whether this error was raised before dispatch.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The credential pool is empty.
    #[error("no API keys configured")]
    NoApiKeys,

    /// The model has no price entry or is not served by this pipe.
    #[error("model {model} not supported. Only {supported} are available.")]
    UnknownModel {
        /// Requested model id.
        model: String,
        /// Human-readable list of supported ids.
        supported: String,
    },

    /// A setting had an unusable value.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Raw value as given.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            reason,
        }
    }

    /// Create an unknown model error listing what is supported.
    #[must_use]
    pub fn unknown_model<'a>(
        model: impl Into<String>,
        supported: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let supported: Vec<&str> = supported.into_iter().collect();
        Self::UnknownModel {
            model: model.into(),
            supported: supported.join(" and "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_message() {
        let err: Error = ConfigError::NoApiKeys.into();
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Configuration error: no API keys configured");
    }

    #[test]
    fn unknown_model_lists_supported() {
        let err = ConfigError::unknown_model("gpt-4o", ["o1-pro", "o3-pro"]);
        assert_eq!(
            err.to_string(),
            "model gpt-4o not supported. Only o1-pro and o3-pro are available."
        );
    }

    #[test]
    fn llm_error_is_not_config() {
        let err: Error = LlmError::timeout(5).into();
        assert!(!err.is_config());
    }
}
