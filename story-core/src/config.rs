//! Pipeline configuration.
//!
//! All settings come from environment variables (a local `.env` file is
//! honored via dotenvy). Credentials are validated once at startup;
//! missing credentials are a configuration error, never a per-call one.

use crate::error::StoryError;
use crate::llm::BackendKind;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Reddit application credentials.
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,

    /// Explicit backend selection; `None` resolves by credential presence.
    pub backend: Option<BackendKind>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    /// Reddit requests allowed per minute.
    pub reddit_rate_budget: u32,
    /// Generation requests allowed per minute.
    pub generation_rate_budget: u32,
    /// How long a request may queue on an exhausted budget.
    pub rate_limit_max_wait: Duration,

    pub default_post_limit: u32,
    pub default_comment_limit: usize,
    /// How many comments to fetch before curation narrows them down.
    pub comment_fetch_limit: u32,
    pub min_comment_score: i64,
    /// Posts with fewer comments than this are skipped in batch mode.
    pub min_post_comments: u32,

    /// Concurrent story pipelines in a batch run.
    pub workers: usize,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reddit_client_id: String::new(),
            reddit_client_secret: String::new(),
            reddit_user_agent: "reddit-stories/0.1".to_string(),
            backend: None,
            anthropic_api_key: None,
            openai_api_key: None,
            gemini_api_key: None,
            reddit_rate_budget: 60,
            generation_rate_budget: 10,
            rate_limit_max_wait: Duration::from_secs(30),
            default_post_limit: 10,
            default_comment_limit: 5,
            comment_fetch_limit: 50,
            min_comment_score: 10,
            min_post_comments: 5,
            workers: 5,
            output_dir: PathBuf::from("output/stories"),
        }
    }
}

impl Config {
    /// Build configuration from the environment.
    pub fn from_env() -> Result<Self, StoryError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let backend = match env_opt("STORY_BACKEND") {
            Some(name) => Some(name.parse()?),
            None => None,
        };

        Ok(Self {
            reddit_client_id: env_opt("REDDIT_CLIENT_ID").unwrap_or_default(),
            reddit_client_secret: env_opt("REDDIT_CLIENT_SECRET").unwrap_or_default(),
            reddit_user_agent: env_opt("REDDIT_USER_AGENT")
                .unwrap_or(defaults.reddit_user_agent),
            backend,
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            reddit_rate_budget: env_parse("REDDIT_RATE_LIMIT", defaults.reddit_rate_budget)?,
            generation_rate_budget: env_parse(
                "GENERATION_RATE_LIMIT",
                defaults.generation_rate_budget,
            )?,
            rate_limit_max_wait: Duration::from_secs(env_parse(
                "RATE_LIMIT_MAX_WAIT_SECS",
                defaults.rate_limit_max_wait.as_secs(),
            )?),
            default_post_limit: env_parse("DEFAULT_POST_LIMIT", defaults.default_post_limit)?,
            default_comment_limit: env_parse(
                "DEFAULT_COMMENT_LIMIT",
                defaults.default_comment_limit,
            )?,
            comment_fetch_limit: env_parse("COMMENT_FETCH_LIMIT", defaults.comment_fetch_limit)?,
            min_comment_score: env_parse("MIN_COMMENT_SCORE", defaults.min_comment_score)?,
            min_post_comments: env_parse("MIN_POST_COMMENTS", defaults.min_post_comments)?,
            workers: env_parse("STORY_WORKERS", defaults.workers)?,
            output_dir: env_opt("STORY_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }

    /// Check that every credential the run needs is present.
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.reddit_client_id.is_empty() {
            return Err(StoryError::Config("REDDIT_CLIENT_ID is required".to_string()));
        }
        if self.reddit_client_secret.is_empty() {
            return Err(StoryError::Config(
                "REDDIT_CLIENT_SECRET is required".to_string(),
            ));
        }
        self.resolved_backend().map(|_| ())
    }

    /// The backend this run will use: the explicit selection if set, else
    /// the first backend with credentials present.
    pub fn resolved_backend(&self) -> Result<BackendKind, StoryError> {
        if let Some(kind) = self.backend {
            let key = match kind {
                BackendKind::Anthropic => &self.anthropic_api_key,
                BackendKind::OpenAi => &self.openai_api_key,
                BackendKind::Gemini => &self.gemini_api_key,
            };
            return if key.is_some() {
                Ok(kind)
            } else {
                Err(StoryError::Config(format!(
                    "backend '{}' selected but its API key is not set",
                    kind.as_str()
                )))
            };
        }

        if self.anthropic_api_key.is_some() {
            Ok(BackendKind::Anthropic)
        } else if self.openai_api_key.is_some() {
            Ok(BackendKind::OpenAi)
        } else if self.gemini_api_key.is_some() {
            Ok(BackendKind::Gemini)
        } else {
            Err(StoryError::Config(
                "no generation backend credentials found".to_string(),
            ))
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, StoryError> {
    match env_opt(key) {
        Some(value) => value
            .parse()
            .map_err(|_| StoryError::Config(format!("could not parse {key}='{value}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_resolution_order() {
        let mut config = Config {
            anthropic_api_key: Some("a".to_string()),
            openai_api_key: Some("o".to_string()),
            gemini_api_key: Some("g".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolved_backend().unwrap(), BackendKind::Anthropic);

        config.anthropic_api_key = None;
        assert_eq!(config.resolved_backend().unwrap(), BackendKind::OpenAi);

        config.openai_api_key = None;
        assert_eq!(config.resolved_backend().unwrap(), BackendKind::Gemini);

        config.gemini_api_key = None;
        assert!(config.resolved_backend().is_err());
    }

    #[test]
    fn test_explicit_backend_requires_its_key() {
        let config = Config {
            backend: Some(BackendKind::Gemini),
            anthropic_api_key: Some("a".to_string()),
            ..Config::default()
        };
        assert!(config.resolved_backend().is_err());

        let config = Config {
            backend: Some(BackendKind::Gemini),
            gemini_api_key: Some("g".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolved_backend().unwrap(), BackendKind::Gemini);
    }

    #[test]
    fn test_validate_requires_reddit_credentials() {
        let config = Config {
            anthropic_api_key: Some("a".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            reddit_client_id: "id".to_string(),
            reddit_client_secret: "secret".to_string(),
            anthropic_api_key: Some("a".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
