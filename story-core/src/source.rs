//! Content source adapter.
//!
//! Wraps the read-only [`reddit::Reddit`] client with the shared rate
//! budget and retry policy. Results keep the upstream's native ranking
//! order, and removed content passes through untouched; filtering belongs
//! to the curator.

use crate::error::StoryError;
use crate::limit::RateLimiter;
use crate::retry::RetryPolicy;
use reddit::{Comment, Post, Reddit, TimeWindow};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Hard ceiling on listing sizes, matching the upstream API cap.
pub const MAX_FETCH_LIMIT: u32 = reddit::MAX_LISTING_LIMIT;

/// Fetches posts and comment trees under a shared rate budget.
pub struct SourceAdapter {
    client: Reddit,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl SourceAdapter {
    pub fn new(client: Reddit, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    /// Fetch the top posts of a subreddit over a time window.
    pub async fn top_posts(
        &self,
        subreddit: &str,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Post>, StoryError> {
        let posts = self
            .call(|| self.client.top_posts(subreddit, window, limit))
            .await?;
        info!(subreddit, count = posts.len(), "fetched posts");
        Ok(posts)
    }

    /// Fetch the top comments of a post.
    pub async fn top_comments(&self, post_id: &str, limit: u32) -> Result<Vec<Comment>, StoryError> {
        let comments = self
            .call(|| self.client.top_comments(post_id, limit))
            .await?;
        info!(post_id, count = comments.len(), "fetched comments");
        Ok(comments)
    }

    /// Run one upstream call under the rate budget, retrying transient
    /// failures. Upstream throttling surfaces as `RateLimited` so callers
    /// can back off; it is not retried here.
    async fn call<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T, StoryError>
    where
        Fut: Future<Output = Result<T, reddit::Error>>,
    {
        let mut attempt = 0;
        loop {
            self.limiter.acquire().await?;

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt + 1 < self.retry.max_attempts => {
                    warn!(attempt, error = %err, "content source call failed, retrying");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn is_transient(err: &reddit::Error) -> bool {
    match err {
        reddit::Error::Network(_) => true,
        reddit::Error::Api { status, .. } => *status == 408 || (500..600).contains(status),
        _ => false,
    }
}
