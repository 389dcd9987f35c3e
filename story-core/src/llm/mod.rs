//! Generation backends.
//!
//! One capability interface over interchangeable generative-text providers.
//! A concrete backend is resolved once at startup from configuration; the
//! rest of the pipeline only sees [`GenerationClient`], which layers the
//! shared rate budget, retry policy, and latency accounting on top of the
//! raw transport.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::config::Config;
use crate::error::StoryError;
use crate::limit::RateLimiter;
use crate::prompt::GenerationRequest;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// The closed set of generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Anthropic,
    OpenAi,
    Gemini,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Anthropic => "anthropic",
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
        }
    }
}

impl FromStr for BackendKind {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, StoryError> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(BackendKind::Anthropic),
            "openai" => Ok(BackendKind::OpenAi),
            "gemini" => Ok(BackendKind::Gemini),
            other => Err(StoryError::Config(format!(
                "unknown generation backend '{other}'"
            ))),
        }
    }
}

/// Transport-level backend failure, classified for retry.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Timeout, 5xx, or throttling. Worth retrying with backoff.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// Invalid credentials or a malformed request. Retrying will not help.
    #[error("permanent backend failure: {0}")]
    Permanent(String),
}

impl BackendError {
    /// Classify an HTTP error status.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        let message = format!("status {status}: {body}");
        if status == 408 || status == 429 || (500..600).contains(&status) {
            BackendError::Transient(message)
        } else {
            BackendError::Permanent(message)
        }
    }
}

/// Capability interface for generative-text providers.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send one completion request and return the raw generated text.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError>;

    fn kind(&self) -> BackendKind;
}

/// Raw backend output with observability metadata. Ephemeral; consumed
/// immediately by the artifact builder.
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    pub word_count: usize,
    pub backend: BackendKind,
    /// Wall-clock time across all attempts.
    pub latency: Duration,
    /// Retries performed before success (0 means first attempt succeeded).
    pub retries: u32,
}

/// Backend wrapper applying the shared rate budget and retry policy.
pub struct GenerationClient {
    backend: Box<dyn GenerationBackend>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl GenerationClient {
    pub fn new(
        backend: Box<dyn GenerationBackend>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            limiter,
            retry,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Generate text for a request.
    ///
    /// Transient failures are retried with backoff up to the policy bound,
    /// then surface as `GenerationUnavailable`. Permanent failures surface
    /// immediately as `GenerationRejected`.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedText, StoryError> {
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            self.limiter.acquire().await?;

            match self.backend.complete(request).await {
                Ok(text) => {
                    let text = text.trim().to_string();
                    let generated = GeneratedText {
                        word_count: text.split_whitespace().count(),
                        text,
                        backend: self.backend.kind(),
                        latency: start.elapsed(),
                        retries: attempt,
                    };
                    info!(
                        backend = generated.backend.as_str(),
                        words = generated.word_count,
                        retries = generated.retries,
                        latency_ms = generated.latency.as_millis() as u64,
                        "generation complete"
                    );
                    return Ok(generated);
                }
                Err(BackendError::Transient(message)) => {
                    if attempt + 1 >= self.retry.max_attempts {
                        return Err(StoryError::GenerationUnavailable {
                            attempts: attempt + 1,
                            message,
                        });
                    }
                    warn!(attempt, message = %message, "transient generation failure, retrying");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(BackendError::Permanent(message)) => {
                    return Err(StoryError::GenerationRejected(message));
                }
            }
        }
    }
}

/// Resolve the active backend from configuration: explicit selection first,
/// else the first backend with credentials present.
pub fn resolve_backend(config: &Config) -> Result<Box<dyn GenerationBackend>, StoryError> {
    let kind = config.resolved_backend()?;
    let backend: Box<dyn GenerationBackend> = match kind {
        BackendKind::Anthropic => {
            let key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| StoryError::Config("ANTHROPIC_API_KEY not set".to_string()))?;
            Box::new(AnthropicBackend::new(key))
        }
        BackendKind::OpenAi => {
            let key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| StoryError::Config("OPENAI_API_KEY not set".to_string()))?;
            Box::new(OpenAiBackend::new(key))
        }
        BackendKind::Gemini => {
            let key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| StoryError::Config("GEMINI_API_KEY not set".to_string()))?;
            Box::new(GeminiBackend::new(key))
        }
    };
    info!(backend = kind.as_str(), "generation backend selected");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_round_trip() {
        for s in ["anthropic", "openai", "gemini"] {
            let kind: BackendKind = s.parse().unwrap();
            assert_eq!(kind.as_str(), s);
        }
        assert!("cohere".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            BackendError::from_status(429, String::new()),
            BackendError::Transient(_)
        ));
        assert!(matches!(
            BackendError::from_status(503, String::new()),
            BackendError::Transient(_)
        ));
        assert!(matches!(
            BackendError::from_status(401, String::new()),
            BackendError::Permanent(_)
        ));
        assert!(matches!(
            BackendError::from_status(400, String::new()),
            BackendError::Permanent(_)
        ));
    }
}
