//! Testing utilities for the story pipeline.
//!
//! Provides `MockBackend`, a scripted generation backend for deterministic
//! pipeline tests without API calls, plus sample source content.

use crate::llm::{BackendError, BackendKind, GenerationBackend};
use crate::prompt::GenerationRequest;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reddit::{Comment, Post};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted reply from the mock backend.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful generation with this text.
    Text(String),
    /// Transient failure (throttle, timeout, 5xx).
    Transient(String),
    /// Permanent failure (bad credentials, malformed request).
    Permanent(String),
}

/// A generation backend that returns scripted replies in order.
///
/// Once the script runs out, further calls return a default story. The
/// call counter can be cloned out before the backend is boxed, so tests
/// can assert how many backend calls a pipeline made.
pub struct MockBackend {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Arc<AtomicU32>,
    delay: Duration,
}

impl MockBackend {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Arc::new(AtomicU32::new(0)),
            delay: Duration::ZERO,
        }
    }

    /// A backend that always succeeds with a story of `words` words.
    pub fn story(words: usize) -> Self {
        Self::new(vec![MockReply::Text(story_text(words))])
    }

    /// Sleep this long inside each `complete` call, so tests can hold a
    /// generation in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Handle to the call counter, valid after the backend is boxed.
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn complete(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.replies.lock().expect("mock lock poisoned").pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Transient(message)) => Err(BackendError::Transient(message)),
            Some(MockReply::Permanent(message)) => Err(BackendError::Permanent(message)),
            None => Ok(story_text(350)),
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }
}

const STORY_WORDS: &[&str] = &[
    "The", "wedding", "guests", "never", "expected", "what", "happened", "next,", "and",
    "the", "best", "man", "still", "tells", "the", "story", "every", "year.",
];

/// Deterministic story text with exactly `words` words.
pub fn story_text(words: usize) -> String {
    (0..words)
        .map(|i| STORY_WORDS[i % STORY_WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

/// A qualifying sample post.
pub fn sample_post() -> Post {
    Post {
        id: "abc123".to_string(),
        title: "What's the weirdest wedding moment?".to_string(),
        body: None,
        author: Some("curious_guest".to_string()),
        score: 1500,
        created: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        subreddit: "AskReddit".to_string(),
        url: "https://reddit.com/r/AskReddit/comments/abc123/".to_string(),
        num_comments: 250,
        over_18: false,
        removed: false,
    }
}

const COMMENT_BODIES: &[&str] = &[
    "The groom read his vows off a crumpled receipt he found in his pocket.",
    "The officiant called the bride by the wrong name three separate times.",
    "A seagull stole the ring bearer's pillow mid-ceremony and flew off with it.",
    "The DJ played the entrance song for the wrong couple's wedding party.",
    "Someone's grandmother caught the bouquet and refused to give it back.",
    "The cake collapsed during the first dance and nobody noticed for an hour.",
];

/// Sample comments with the given scores, newest last, every body long
/// enough to pass curation.
pub fn sample_comments(scores: &[i64]) -> Vec<Comment> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| Comment {
            id: format!("c{}", i + 1),
            post_id: "abc123".to_string(),
            author: Some(format!("commenter_{}", i + 1)),
            body: COMMENT_BODIES[i % COMMENT_BODIES.len()].to_string(),
            score,
            created: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
            removed: false,
        })
        .collect()
}
