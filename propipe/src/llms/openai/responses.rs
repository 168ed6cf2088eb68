//! OpenAI ResponsesProvider implementation.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::llms::error::LlmError;
use crate::responses::{ResponsesProvider, ResponsesRequest, ResponsesResponse};

use super::client::OpenAI;

#[async_trait]
impl ResponsesProvider for OpenAI {
    async fn create_response(
        &self,
        api_key: &str,
        request: &ResponsesRequest,
    ) -> Result<ResponsesResponse> {
        let url = self.responses_url();
        debug!(model = %request.model, items = request.input.len(), "sending responses request");

        let response = self
            .build_request(&url, api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "responses request failed");
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(&e, self.timeout_secs))?;
        Self::parse_body(&response_text)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
