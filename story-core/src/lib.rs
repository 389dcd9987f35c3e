//! Reddit discussion to AI narrative story pipeline.
//!
//! This crate provides:
//! - Content fetching and curation from a Reddit discussion
//! - Style-parameterized prompt assembly
//! - Interchangeable generative-text backends with retry and rate budgets
//! - Validated, immutable story artifacts persisted in multiple formats
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{BatchRunner, Config, StoryPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let pipeline = Arc::new(StoryPipeline::from_config(&config)?);
//!
//!     let runner = BatchRunner::new(pipeline, config.workers);
//!     let summary = runner
//!         .run("AskReddit", "day".parse()?, config.default_post_limit, "comedy")
//!         .await?;
//!
//!     println!("{} succeeded, {} failed", summary.succeeded(), summary.failed());
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod curate;
pub mod error;
pub mod limit;
pub mod llm;
pub mod persist;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod source;
pub mod style;
pub mod testing;

// Primary public API
pub use artifact::{SourceComment, SourcePost, StoryArtifact};
pub use config::Config;
pub use curate::{CurationResult, Curator};
pub use error::{ErrorKind, StoryError};
pub use limit::RateLimiter;
pub use llm::{BackendKind, GeneratedText, GenerationClient};
pub use persist::{OutputFormat, PersistenceWriter};
pub use pipeline::{BatchRunner, BatchSummary, Outcome, StoryOutcome, StoryPipeline};
pub use prompt::{GenerationRequest, PromptAssembler};
pub use retry::RetryPolicy;
pub use source::SourceAdapter;
pub use style::{StyleProfile, STYLES};
