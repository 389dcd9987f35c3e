//! Anthropic Messages API backend.

use super::{BackendError, BackendKind, GenerationBackend};
use crate::prompt::GenerationRequest;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Creative but not erratic; shared by all backends.
pub(crate) const TEMPERATURE: f32 = 0.8;

pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set the model for this backend.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_headers(&self) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| BackendError::Permanent(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = ApiRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{API_BASE}/messages"))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transient(format!("network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Permanent(format!("unexpected response shape: {e}")))?;

        let text: String = api_response
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ApiContent>,
}

#[derive(Deserialize)]
struct ApiContent {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind() {
        let backend = AnthropicBackend::new("test-key");
        assert_eq!(backend.kind(), BackendKind::Anthropic);
    }

    #[test]
    fn test_with_model() {
        let backend = AnthropicBackend::new("test-key").with_model("claude-3-opus");
        assert_eq!(backend.model, "claude-3-opus");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"content":[{"type":"text","text":"Once upon a time"},{"type":"text","text":", the end."}]}"#;
        let response: ApiResponse = serde_json::from_str(json).unwrap();
        let text: String = response
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect();
        assert_eq!(text, "Once upon a time, the end.");
    }
}
