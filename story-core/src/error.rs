//! Error types for the story pipeline.
//!
//! Uses thiserror for ergonomic error definition. Every failure carries a
//! [`ErrorKind`] so batch outcomes can report what went wrong without
//! holding the full error value.

use std::time::Duration;

/// Main error type for the story pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    /// A caller-supplied parameter was out of range or malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A rate budget was exhausted and the maximum wait elapsed.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// No comment on the post survived curation.
    #[error("No eligible content for post {post_id}")]
    NoEligibleContent { post_id: String },

    /// The requested style is not in the style table.
    #[error("Unknown story style '{0}'")]
    InvalidStyle(String),

    /// Transient backend failures exhausted all retries.
    #[error("Generation unavailable after {attempts} attempts: {message}")]
    GenerationUnavailable { attempts: u32, message: String },

    /// The backend rejected the request permanently (bad credentials,
    /// malformed request). Retrying will not help.
    #[error("Generation rejected: {0}")]
    GenerationRejected(String),

    /// The backend returned empty or unusably short text.
    #[error("Empty generation: backend returned {word_count} words")]
    EmptyGeneration { word_count: usize },

    /// Content source failure other than the kinds above.
    #[error("Content source error: {0}")]
    Source(reddit::Error),

    /// Configuration error detected at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoryError {
    /// The reporting kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoryError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            StoryError::RateLimited(_) => ErrorKind::RateLimited,
            StoryError::NoEligibleContent { .. } => ErrorKind::NoEligibleContent,
            StoryError::InvalidStyle(_) => ErrorKind::InvalidStyle,
            StoryError::GenerationUnavailable { .. } => ErrorKind::GenerationUnavailable,
            StoryError::GenerationRejected(_) => ErrorKind::GenerationRejected,
            StoryError::EmptyGeneration { .. } => ErrorKind::EmptyGeneration,
            StoryError::Source(_) => ErrorKind::Source,
            StoryError::Config(_) => ErrorKind::Config,
            StoryError::Io(_) => ErrorKind::Io,
            StoryError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub(crate) fn rate_limited_after(waited: Duration) -> Self {
        StoryError::RateLimited(format!(
            "budget exhausted, gave up after waiting {}ms",
            waited.as_millis()
        ))
    }
}

impl From<reddit::Error> for StoryError {
    fn from(err: reddit::Error) -> Self {
        match err {
            reddit::Error::InvalidParameter(msg) => StoryError::InvalidParameter(msg),
            reddit::Error::RateLimited { retry_after } => StoryError::RateLimited(format!(
                "upstream throttled{}",
                retry_after
                    .map(|d| format!(", retry after {}s", d.as_secs()))
                    .unwrap_or_default()
            )),
            reddit::Error::NoCredentials => {
                StoryError::Config("Reddit credentials missing or rejected".to_string())
            }
            other => StoryError::Source(other),
        }
    }
}

/// Classification of a failure for per-story outcome records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    RateLimited,
    NoEligibleContent,
    InvalidStyle,
    GenerationUnavailable,
    GenerationRejected,
    EmptyGeneration,
    Source,
    Config,
    Io,
    Serialization,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = StoryError::NoEligibleContent {
            post_id: "abc".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NoEligibleContent);

        let err = StoryError::GenerationUnavailable {
            attempts: 3,
            message: "timeout".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::GenerationUnavailable);
    }

    #[test]
    fn test_reddit_error_mapping() {
        let err: StoryError = reddit::Error::InvalidParameter("bad limit".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err: StoryError = reddit::Error::RateLimited { retry_after: None }.into();
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err: StoryError = reddit::Error::Network("reset".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Source);
    }
}
