//! HTTP generation provider client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Attachment, GenerationProvider, ProviderError};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    instruction: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

/// Attachment wire shape: base64 payload plus its media type.
#[derive(Debug, Serialize)]
struct InlineData {
    data: String,
    media_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// JSON-over-HTTP provider client.
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpProvider {
    /// Create a client against the given endpoint with a request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl GenerationProvider for HttpProvider {
    async fn generate(
        &self,
        instruction: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            model: &self.model,
            instruction,
            inline_data: attachment.map(|a| InlineData {
                data: BASE64.encode(&a.data),
                media_type: a.media_type.clone(),
            }),
        };

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            has_attachment = attachment.is_some(),
            "dispatching generation request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::UnexpectedResponse(err.to_string()))?;

        if parsed.text.trim().is_empty() {
            return Err(ProviderError::UnexpectedResponse(
                "empty text field".to_string(),
            ));
        }

        Ok(parsed.text)
    }
}
