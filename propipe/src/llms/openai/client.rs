//! OpenAI HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::PipeConfig;
use crate::error::Result;
use crate::llms::error::LlmError;
use crate::responses::ResponsesResponse;

/// OpenAI error response.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    pub error: OpenAIError,
}

/// OpenAI error details.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// OpenAI API client.
///
/// Holds no credential: the key is supplied per request so a rotator can
/// spread calls over several keys.
#[derive(Debug, Clone)]
pub struct OpenAI {
    pub(crate) base_url: String,
    pub(crate) timeout_secs: u64,
    pub(crate) client: Client,
}

impl OpenAI {
    /// Create a client for `base_url` with a whole-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Internal`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout_secs: timeout.as_secs(),
            client,
        })
    }

    /// Create a client from pipe settings.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Internal`] if the HTTP client cannot be built.
    pub fn from_config(config: &PipeConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the responses URL.
    pub(crate) fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url)
    }

    /// Build a JSON POST authenticated with `api_key`.
    pub(crate) fn build_request(&self, url: &str, api_key: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
    }

    /// Parse a successful response body.
    pub(crate) fn parse_body(body: &str) -> Result<ResponsesResponse> {
        serde_json::from_str(body).map_err(|e| {
            LlmError::response_format(
                "valid Responses API body",
                format!("parse error: {e}, response: {body}"),
            )
            .into()
        })
    }

        /// Parse an error response from OpenAI.
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
            let error = error_response.error;
            let code = error
                .code
                .or(error.error_type)
                .unwrap_or_else(|| "unknown".to_owned());

            return match status {
                401 => LlmError::auth("openai", error.message),
                429 => LlmError::rate_limited("openai"),
                _ => LlmError::provider_code("openai", code, error.message),
            };
        }

        match status {
            401 => LlmError::auth("openai", body.to_owned()),
            429 => LlmError::rate_limited("openai"),
            _ => LlmError::http_status(status, body.to_owned()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn builds_responses_url() {
        let client = OpenAI::new("http://localhost:8080/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.responses_url(), "http://localhost:8080/v1/responses");
        assert_eq!(client.timeout_secs, 5);
    }

    #[test]
    fn from_config_uses_base_url() {
        let config = PipeConfig::new(["k"]).with_base_url("https://proxy.example/v1");
        let client = OpenAI::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://proxy.example/v1");
        assert_eq!(client.timeout_secs, 600);
    }

    #[test]
    fn parse_error_maps_statuses() {
        let body = r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        assert!(matches!(OpenAI::parse_error(401, body), LlmError::Auth { .. }));
        assert!(matches!(
            OpenAI::parse_error(429, body),
            LlmError::RateLimited { .. }
        ));

        match OpenAI::parse_error(400, body) {
            LlmError::Provider { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("invalid_api_key"));
                assert_eq!(message, "Incorrect API key");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_error_falls_back_to_status() {
        match OpenAI::parse_error(502, "bad gateway") {
            LlmError::HttpStatus { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_body_is_response_format_error() {
        match OpenAI::parse_body("<html>oops</html>").unwrap_err() {
            Error::Llm(LlmError::ResponseFormat { expected, got }) => {
                assert_eq!(expected, "valid Responses API body");
                assert!(got.contains("<html>oops</html>"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let parsed = OpenAI::parse_body(r#"{"status": "completed", "output_text": "hi"}"#).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("hi"));
    }
}
