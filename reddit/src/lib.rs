//! Minimal read-only Reddit API client.
//!
//! This crate provides a focused client for the listings endpoints used by
//! story generation:
//! - OAuth2 application-only authentication (client credentials grant)
//! - Top posts for a subreddit over a time window
//! - Top-level comments for a post
//!
//! The client is transport-only: results come back in Reddit's native
//! ranking order, removed content is returned with its removal flag set,
//! and no retry is performed here. Callers own retry and rate budgeting.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Listings accept at most this many items per request.
pub const MAX_LISTING_LIMIT: u32 = 100;

/// Errors that can occur when using the Reddit client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Reddit credentials not configured")]
    NoCredentials,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by Reddit")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Time window for top-post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    /// The query-parameter value Reddit expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "hour" => Ok(TimeWindow::Hour),
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "year" => Ok(TimeWindow::Year),
            "all" => Ok(TimeWindow::All),
            other => Err(Error::InvalidParameter(format!(
                "unknown time window '{other}' (expected hour/day/week/month/year/all)"
            ))),
        }
    }
}

/// A fetched post. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    /// Self-text body; `None` for link posts.
    pub body: Option<String>,
    /// Author handle; `None` when the account is deleted.
    pub author: Option<String>,
    pub score: i64,
    pub created: DateTime<Utc>,
    pub subreddit: String,
    pub url: String,
    pub num_comments: u32,
    pub over_18: bool,
    /// Set when the post was removed or deleted upstream.
    pub removed: bool,
}

/// A fetched comment. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Id of the post this comment belongs to.
    pub post_id: String,
    /// Author handle; `None` when the account is deleted.
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    pub created: DateTime<Utc>,
    /// Set when the comment was removed or deleted upstream.
    pub removed: bool,
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Reddit API client with application-only authentication.
#[derive(Debug)]
pub struct Reddit {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    token: Mutex<Option<CachedToken>>,
}

impl Reddit {
    /// Create a new client with the given application credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self, Error> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::NoCredentials);
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?,
            client_id,
            client_secret,
            user_agent: user_agent.into(),
            token: Mutex::new(None),
        })
    }

    /// Fetch the top posts of a subreddit for a time window, in Reddit's
    /// native ranking order. Removed posts are returned with their removal
    /// flag set; filtering is the caller's concern.
    pub async fn top_posts(
        &self,
        subreddit: &str,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Post>, Error> {
        validate_limit(limit)?;
        if subreddit.is_empty() || !subreddit.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(Error::InvalidParameter(format!(
                "invalid subreddit name '{subreddit}'"
            )));
        }

        let url = format!(
            "{API_BASE}/r/{subreddit}/top?t={}&limit={limit}&raw_json=1",
            window.as_str()
        );
        let listing: Listing = self.get(&url).await?;

        let posts: Vec<Post> = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| child.data.into_post())
            .collect();

        debug!(subreddit, count = posts.len(), "fetched top posts");
        Ok(posts)
    }

    /// Fetch the top-level comments of a post sorted by top, in Reddit's
    /// native ranking order.
    pub async fn top_comments(&self, post_id: &str, limit: u32) -> Result<Vec<Comment>, Error> {
        validate_limit(limit)?;
        if post_id.is_empty() {
            return Err(Error::InvalidParameter("empty post id".to_string()));
        }

        let url = format!("{API_BASE}/comments/{post_id}?sort=top&limit={limit}&depth=1&raw_json=1");
        // The comments endpoint returns a two-element array: the post
        // listing followed by the comment listing.
        let listings: Vec<Listing> = self.get(&url).await?;
        let comment_listing = listings
            .into_iter()
            .nth(1)
            .ok_or_else(|| Error::Parse("missing comment listing".to_string()))?;

        let comments: Vec<Comment> = comment_listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t1")
            .filter_map(|child| child.data.into_comment(post_id))
            .take(limit as usize)
            .collect();

        debug!(post_id, count = comments.len(), "fetched top comments");
        Ok(comments)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(url)
            .headers(self.build_headers()?)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Error::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| Error::Parse(e.to_string()))
    }

    /// Fetch or reuse the application-only bearer token.
    async fn access_token(&self) -> Result<String, Error> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .headers(self.build_headers()?)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::NoCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        // Refresh a minute before actual expiry.
        let ttl = token.expires_in.saturating_sub(60);
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        debug!("obtained application-only access token");
        Ok(access_token)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| Error::Config(format!("Invalid user agent: {e}")))?,
        );
        Ok(headers)
    }
}

fn validate_limit(limit: u32) -> Result<(), Error> {
    if limit == 0 || limit > MAX_LISTING_LIMIT {
        return Err(Error::InvalidParameter(format!(
            "limit must be between 1 and {MAX_LISTING_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    #[serde(default)]
    kind: String,
    data: ThingData,
}

/// Union of the post and comment fields we read. Reddit returns both
/// shapes under the same listing envelope.
#[derive(Debug, Deserialize)]
struct ThingData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    num_comments: Option<u32>,
    #[serde(default)]
    over_18: bool,
    #[serde(default)]
    removed_by_category: Option<String>,
}

impl ThingData {
    fn into_post(self) -> Option<Post> {
        let title = self.title?;
        let author = normalize_author(self.author);
        let selftext_removed = self
            .selftext
            .as_deref()
            .map(is_removed_marker)
            .unwrap_or(false);
        let body = self
            .selftext
            .filter(|text| !text.is_empty() && !is_removed_marker(text));
        let removed = self.removed_by_category.is_some() || author.is_none() || selftext_removed;

        let url = self
            .url
            .or_else(|| self.permalink.map(|p| format!("https://reddit.com{p}")))
            .unwrap_or_default();

        Some(Post {
            id: self.id,
            title,
            body,
            author,
            score: self.score,
            created: epoch_to_datetime(self.created_utc),
            subreddit: self.subreddit.unwrap_or_default(),
            url,
            num_comments: self.num_comments.unwrap_or(0),
            over_18: self.over_18,
            removed,
        })
    }

    fn into_comment(self, post_id: &str) -> Option<Comment> {
        let body = self.body?;
        let author = normalize_author(self.author);
        let removed = author.is_none() || is_removed_marker(&body);

        Some(Comment {
            id: self.id,
            post_id: post_id.to_string(),
            author,
            body,
            score: self.score,
            created: epoch_to_datetime(self.created_utc),
            removed,
        })
    }
}

fn normalize_author(author: Option<String>) -> Option<String> {
    author.filter(|a| !a.is_empty() && a != "[deleted]")
}

fn is_removed_marker(text: &str) -> bool {
    matches!(text.trim(), "[removed]" | "[deleted]")
}

fn epoch_to_datetime(epoch: f64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch as i64, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_round_trip() {
        for s in ["hour", "day", "week", "month", "year", "all"] {
            let window: TimeWindow = s.parse().unwrap();
            assert_eq!(window.as_str(), s);
        }
    }

    #[test]
    fn test_time_window_invalid() {
        let err = "fortnight".parse::<TimeWindow>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_limit_validation() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(MAX_LISTING_LIMIT).is_ok());
        assert!(matches!(
            validate_limit(0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            validate_limit(MAX_LISTING_LIMIT + 1),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let err = Reddit::new("", "", "test-agent/0.1").unwrap_err();
        assert!(matches!(err, Error::NoCredentials));
    }

    #[test]
    fn test_parse_post_listing() {
        let json = r#"{
            "data": {
                "children": [{
                    "kind": "t3",
                    "data": {
                        "id": "abc123",
                        "title": "What's the weirdest wedding moment?",
                        "selftext": "",
                        "author": "curious_guest",
                        "score": 1500,
                        "created_utc": 1700000000.0,
                        "subreddit": "AskReddit",
                        "permalink": "/r/AskReddit/comments/abc123/",
                        "num_comments": 250,
                        "over_18": false
                    }
                }]
            }
        }"#;

        let listing: Listing = serde_json::from_str(json).unwrap();
        let post = listing.data.children.into_iter().next().unwrap();
        let post = post.data.into_post().unwrap();

        assert_eq!(post.id, "abc123");
        assert_eq!(post.subreddit, "AskReddit");
        assert_eq!(post.num_comments, 250);
        assert!(!post.removed);
        assert!(post.body.is_none());
        assert!(post.url.starts_with("https://reddit.com/r/AskReddit"));
    }

    #[test]
    fn test_parse_deleted_comment() {
        let json = r#"{
            "id": "c9",
            "body": "[removed]",
            "author": "[deleted]",
            "score": 12,
            "created_utc": 1700000100.0
        }"#;

        let data: ThingData = serde_json::from_str(json).unwrap();
        let comment = data.into_comment("abc123").unwrap();

        assert!(comment.removed);
        assert!(comment.author.is_none());
        assert_eq!(comment.post_id, "abc123");
    }

    #[test]
    fn test_parse_live_comment() {
        let json = r#"{
            "id": "c1",
            "body": "The groom read his vows off a receipt.",
            "author": "best_man_2019",
            "score": 50,
            "created_utc": 1700000200.0
        }"#;

        let data: ThingData = serde_json::from_str(json).unwrap();
        let comment = data.into_comment("abc123").unwrap();

        assert!(!comment.removed);
        assert_eq!(comment.author.as_deref(), Some("best_man_2019"));
        assert_eq!(comment.score, 50);
    }
}
