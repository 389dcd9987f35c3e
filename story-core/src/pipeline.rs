//! The story pipeline and batch runner.
//!
//! A single story flows strictly left to right: fetch comments, curate,
//! assemble the prompt, generate, build the artifact, persist. Batch runs
//! execute multiple story pipelines concurrently up to a bounded worker
//! count, with per-story outcomes isolated from each other and cooperative
//! cancellation: in-flight stories finish cleanly, nothing new starts.

use crate::artifact::{self, StoryArtifact};
use crate::config::Config;
use crate::curate::Curator;
use crate::error::{ErrorKind, StoryError};
use crate::limit::RateLimiter;
use crate::llm::{self, GenerationClient};
use crate::persist::{OutputFormat, PersistenceWriter};
use crate::prompt::PromptAssembler;
use crate::retry::RetryPolicy;
use crate::source::SourceAdapter;
use reddit::{Comment, Post, Reddit, TimeWindow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One complete story pipeline: every stage from comment fetch to persisted
/// artifact, for one post at a time.
pub struct StoryPipeline {
    source: SourceAdapter,
    curator: Curator,
    assembler: PromptAssembler,
    client: GenerationClient,
    writer: PersistenceWriter,
    formats: Vec<OutputFormat>,
    comment_limit: usize,
    comment_fetch_limit: u32,
    min_comment_score: i64,
    min_post_comments: u32,
}

impl StoryPipeline {
    /// Wire up a pipeline from configuration: Reddit client, rate budgets,
    /// backend resolution, output directory. Fails fast on missing
    /// credentials.
    pub fn from_config(config: &Config) -> Result<Self, StoryError> {
        config.validate()?;

        let reddit = Reddit::new(
            &config.reddit_client_id,
            &config.reddit_client_secret,
            &config.reddit_user_agent,
        )?;
        let source_limiter = Arc::new(RateLimiter::new(
            config.reddit_rate_budget,
            Duration::from_secs(60),
            config.rate_limit_max_wait,
        ));
        let generation_limiter = Arc::new(RateLimiter::new(
            config.generation_rate_budget,
            Duration::from_secs(60),
            config.rate_limit_max_wait,
        ));
        let retry = RetryPolicy::default();

        let backend = llm::resolve_backend(config)?;
        let source = SourceAdapter::new(reddit, source_limiter, retry);
        let client = GenerationClient::new(backend, generation_limiter, retry);
        let writer = PersistenceWriter::new(&config.output_dir);

        Ok(Self::new(
            source,
            Curator::default(),
            client,
            writer,
            vec![OutputFormat::Markdown, OutputFormat::Json],
            config,
        ))
    }

    /// Assemble a pipeline from parts. Useful when tests substitute a
    /// scripted backend.
    pub fn new(
        source: SourceAdapter,
        curator: Curator,
        client: GenerationClient,
        writer: PersistenceWriter,
        formats: Vec<OutputFormat>,
        config: &Config,
    ) -> Self {
        let assembler = PromptAssembler::new(client.kind());
        Self {
            source,
            curator,
            assembler,
            client,
            writer,
            formats,
            comment_limit: config.default_comment_limit,
            comment_fetch_limit: config.comment_fetch_limit,
            min_comment_score: config.min_comment_score,
            min_post_comments: config.min_post_comments,
        }
    }

    /// Run the full pipeline for one post, fetching its comments first.
    pub async fn run_post(
        &self,
        post: &Post,
        style: &str,
    ) -> Result<(StoryArtifact, Vec<PathBuf>), StoryError> {
        let comments = self
            .source
            .top_comments(&post.id, self.comment_fetch_limit)
            .await?;
        self.generate_story(post, &comments, style).await
    }

    /// Run the pipeline stages after comment fetch: curate, assemble,
    /// generate, build, persist. Stages execute strictly in order; a post
    /// with no eligible comments fails here without any backend call.
    pub async fn generate_story(
        &self,
        post: &Post,
        comments: &[Comment],
        style: &str,
    ) -> Result<(StoryArtifact, Vec<PathBuf>), StoryError> {
        let curation = self
            .curator
            .curate(comments, self.comment_limit, self.min_comment_score);
        if curation.is_empty() {
            return Err(StoryError::NoEligibleContent {
                post_id: post.id.clone(),
            });
        }

        let request = self.assembler.assemble(post, &curation, style)?;
        debug!(
            post_id = %post.id,
            style,
            prompt_tokens = request.token_estimate(),
            "assembled generation request"
        );

        let generated = self.client.generate(&request).await?;
        let artifact = artifact::build(&request, generated, post, &curation)?;
        let paths = self.writer.write(&artifact, &self.formats).await?;

        info!(
            post_id = %post.id,
            artifact_id = %artifact.id,
            words = artifact.word_count,
            "story generated"
        );
        Ok((artifact, paths))
    }
}

/// Per-story outcome record for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryOutcome {
    pub post_id: String,
    pub post_title: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        artifact_id: Uuid,
        word_count: usize,
        word_count_warning: bool,
        paths: Vec<PathBuf>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl StoryOutcome {
    fn from_result(post: &Post, result: Result<(StoryArtifact, Vec<PathBuf>), StoryError>) -> Self {
        let outcome = match result {
            Ok((artifact, paths)) => Outcome::Success {
                artifact_id: artifact.id,
                word_count: artifact.word_count,
                word_count_warning: artifact.word_count_warning,
                paths,
            },
            Err(err) => Outcome::Failure {
                kind: err.kind(),
                message: err.to_string(),
            },
        };
        Self {
            post_id: post.id.clone(),
            post_title: post.title.clone(),
            outcome,
        }
    }

    fn skipped(post: &Post, message: impl Into<String>) -> Self {
        Self {
            post_id: post.id.clone(),
            post_title: post.title.clone(),
            outcome: Outcome::Failure {
                kind: ErrorKind::NoEligibleContent,
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

/// Result of a batch run: one outcome per post, in completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub outcomes: Vec<StoryOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Runs story pipelines for a batch of posts with bounded concurrency.
pub struct BatchRunner {
    pipeline: Arc<StoryPipeline>,
    workers: usize,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<StoryPipeline>, workers: usize) -> Self {
        Self {
            pipeline,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Token for cooperative cancellation. Cancelling stops new stories
    /// from starting; in-flight stories complete or fail cleanly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetch the top posts of a subreddit and generate a story for each.
    pub async fn run(
        &self,
        subreddit: &str,
        window: TimeWindow,
        post_limit: u32,
        style: &str,
    ) -> Result<BatchSummary, StoryError> {
        let posts = self
            .pipeline
            .source
            .top_posts(subreddit, window, post_limit)
            .await?;
        Ok(self.run_posts(posts, style).await)
    }

    /// Generate a story for each post, fetching comments per post.
    /// Per-story failures are isolated: one story's failure never aborts
    /// its siblings.
    pub async fn run_posts(&self, posts: Vec<Post>, style: &str) -> BatchSummary {
        self.run_batch(posts.into_iter().map(|post| (post, None)).collect(), style)
            .await
    }

    /// Generate a story for each post whose comments are already in hand,
    /// skipping the comment fetch. Gating, concurrency, and cancellation
    /// behave exactly as in [`run_posts`](Self::run_posts).
    pub async fn run_prepared(
        &self,
        posts: Vec<(Post, Vec<Comment>)>,
        style: &str,
    ) -> BatchSummary {
        self.run_batch(
            posts
                .into_iter()
                .map(|(post, comments)| (post, Some(comments)))
                .collect(),
            style,
        )
        .await
    }

    async fn run_batch(
        &self,
        posts: Vec<(Post, Option<Vec<Comment>>)>,
        style: &str,
    ) -> BatchSummary {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut outcomes = Vec::new();

        for (post, comments) in posts {
            if self.cancel.is_cancelled() {
                info!("batch cancelled, not starting further stories");
                break;
            }

            if post.removed {
                debug!(post_id = %post.id, "skipping removed post");
                outcomes.push(StoryOutcome::skipped(&post, "skipped: post was removed"));
                continue;
            }
            if post.num_comments < self.pipeline.min_post_comments {
                debug!(post_id = %post.id, "skipping post below comment floor");
                outcomes.push(StoryOutcome::skipped(
                    &post,
                    format!("skipped: post has {} comments", post.num_comments),
                ));
                continue;
            }

            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let pipeline = self.pipeline.clone();
            let style = style.to_string();
            tasks.spawn(async move {
                let _permit = permit;
                let result = match &comments {
                    Some(comments) => pipeline.generate_story(&post, comments, &style).await,
                    None => pipeline.run_post(&post, &style).await,
                };
                StoryOutcome::from_result(&post, result)
            });
        }

        // Collect in completion order; no ordering guarantee across stories.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(error = %err, "story task did not complete"),
            }
        }

        let summary = BatchSummary { outcomes };
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "batch complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_summary_counts() {
        let summary = BatchSummary {
            outcomes: vec![
                StoryOutcome {
                    post_id: "p1".to_string(),
                    post_title: "t1".to_string(),
                    outcome: Outcome::Success {
                        artifact_id: Uuid::new_v4(),
                        word_count: 350,
                        word_count_warning: false,
                        paths: vec![],
                    },
                },
                StoryOutcome {
                    post_id: "p2".to_string(),
                    post_title: "t2".to_string(),
                    outcome: Outcome::Failure {
                        kind: ErrorKind::NoEligibleContent,
                        message: "no comments survived".to_string(),
                    },
                },
            ],
        };

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn test_outcome_serializes_with_kind() {
        let outcome = StoryOutcome {
            post_id: "p2".to_string(),
            post_title: "t2".to_string(),
            outcome: Outcome::Failure {
                kind: ErrorKind::GenerationUnavailable,
                message: "retries exhausted".to_string(),
            },
        };

        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"failure\""));
        assert!(json.contains("generation_unavailable"));
    }
}
