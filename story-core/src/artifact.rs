//! Story artifact construction and validation.
//!
//! The builder turns raw generated text into the final immutable
//! [`StoryArtifact`]: it validates the word count, derives a title from the
//! source post per style, stamps identity and time, and snapshots the
//! source content so the artifact stays whole even if the post or comments
//! are deleted upstream.

use crate::curate::CurationResult;
use crate::error::StoryError;
use crate::llm::{BackendKind, GeneratedText};
use crate::prompt::GenerationRequest;
use chrono::{DateTime, Utc};
use reddit::Post;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Generations below this word count signal a backend or prompt failure.
const MIN_STORY_WORDS: usize = 50;

/// Allowed drift outside the style's word range before flagging, as a
/// fraction of the bound.
const WORD_TOLERANCE: f64 = 0.20;

/// Snapshot of the source post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePost {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub url: String,
    pub score: i64,
}

impl From<&Post> for SourcePost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            subreddit: post.subreddit.clone(),
            url: post.url.clone(),
            score: post.score,
        }
    }
}

/// Snapshot of one curated source comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceComment {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
}

/// The final generated story. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryArtifact {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub style: String,
    pub word_count: usize,
    pub generated_at: DateTime<Utc>,
    pub source_post: SourcePost,
    pub source_comments: Vec<SourceComment>,
    pub backend_used: BackendKind,
    /// Set when the word count drifted outside the style's tolerance band.
    pub word_count_warning: bool,
    pub latency_ms: u64,
    pub retries: u32,
}

/// Build a validated artifact from generated text.
///
/// Word-count drift outside the tolerance band is flagged, not rejected;
/// backends do not guarantee exact counts. Text below the absolute minimum
/// fails with `EmptyGeneration`.
pub fn build(
    request: &GenerationRequest,
    generated: GeneratedText,
    post: &Post,
    curation: &CurationResult,
) -> Result<StoryArtifact, StoryError> {
    let word_count = generated.word_count;
    if word_count < MIN_STORY_WORDS {
        return Err(StoryError::EmptyGeneration { word_count });
    }

    let style = request.style;
    let lo = (style.min_words as f64 * (1.0 - WORD_TOLERANCE)) as usize;
    let hi = (style.max_words as f64 * (1.0 + WORD_TOLERANCE)) as usize;
    let word_count_warning = word_count < lo || word_count > hi;
    if word_count_warning {
        warn!(
            word_count,
            min = style.min_words,
            max = style.max_words,
            "story word count drifted outside tolerance"
        );
    }

    Ok(StoryArtifact {
        id: Uuid::new_v4(),
        title: derive_title(style.title_prefix, &post.title),
        body: generated.text,
        style: style.name.to_string(),
        word_count,
        generated_at: Utc::now(),
        source_post: SourcePost::from(post),
        source_comments: curation
            .comments
            .iter()
            .map(|c| SourceComment {
                id: c.id.clone(),
                author: c.author.clone(),
                body: c.body.clone(),
                score: c.score,
            })
            .collect(),
        backend_used: generated.backend,
        word_count_warning,
        latency_ms: generated.latency.as_millis() as u64,
        retries: generated.retries,
    })
}

/// Derive a story title from the post title. Stable for a given style:
/// question titles fold into the prefix, statements keep a colon.
fn derive_title(prefix: &str, post_title: &str) -> String {
    match post_title.strip_suffix('?') {
        Some(base) => format!("{prefix} {}", base.trim_end()),
        None => format!("{prefix}: {post_title}"),
    }
}
