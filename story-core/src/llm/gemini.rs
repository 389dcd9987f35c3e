//! Google Gemini generateContent backend.

use super::anthropic::TEMPERATURE;
use super::{BackendError, BackendKind, GenerationBackend};
use crate::prompt::GenerationRequest;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiBackend {
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
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| BackendError::Permanent(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = ApiRequest {
            system_instruction: ApiContent {
                role: None,
                parts: vec![ApiPart {
                    text: &request.system,
                }],
            },
            contents: vec![ApiContent {
                role: Some("user"),
                parts: vec![ApiPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(format!("{API_BASE}/{}:generateContent", self.model))
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

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Permanent("response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: ApiContent<'a>,
    contents: Vec<ApiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct ApiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<ApiPart<'a>>,
}

#[derive(Serialize)]
struct ApiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Deserialize)]
struct ApiCandidate {
    content: ApiCandidateContent,
}

#[derive(Deserialize)]
struct ApiCandidateContent {
    #[serde(default)]
    parts: Vec<ApiResponsePart>,
}

#[derive(Deserialize)]
struct ApiResponsePart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind() {
        let backend = GeminiBackend::new("test-key");
        assert_eq!(backend.kind(), BackendKind::Gemini);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Part one. "},{"text":"Part two."}],"role":"model"}}]}"#;
        let response: ApiResponse = serde_json::from_str(json).unwrap();
        let text: String = response.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "Part one. Part two.");
    }
}
