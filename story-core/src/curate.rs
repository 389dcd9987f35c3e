//! Comment curation: filtering and ranking raw comments into a bounded,
//! high-quality subset usable as story source material.
//!
//! Curation is deterministic: the same input sequence and parameters always
//! produce the same output sequence. Survivors are ordered by score
//! descending, ties broken by earlier creation time.

use once_cell::sync::Lazy;
use reddit::Comment;
use std::collections::HashSet;
use tracing::debug;

/// Known automated accounts excluded from story material.
static BOT_ACCOUNTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "AutoModerator",
        "RemindMeBot",
        "WikiTextBot",
        "TotesMessenger",
        "GoodBot_BadBot",
        "B0tRank",
        "RepostSleuthBot",
    ]
});

/// Minimum cleaned body length for a comment to count as signal.
const DEFAULT_MIN_CHARS: usize = 20;

/// Cleaned comment bodies are capped at this many characters.
const MAX_BODY_CHARS: usize = 1000;

/// Longest allowed run of a repeated symbol character.
const MAX_SYMBOL_RUN: usize = 3;

/// The result of curating a comment set.
#[derive(Debug, Clone)]
pub struct CurationResult {
    /// Surviving comments with cleaned bodies, highest quality first.
    pub comments: Vec<Comment>,
    /// Total comments examined.
    pub examined: usize,
    /// Comments rejected by the curation predicates.
    pub rejected: usize,
}

impl CurationResult {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }
}

/// Filters and ranks comments for story generation.
pub struct Curator {
    /// Lowercased author handles to reject, exact match.
    denylist: HashSet<String>,
    min_chars: usize,
}

impl Default for Curator {
    fn default() -> Self {
        Self::new(BOT_ACCOUNTS.iter().copied())
    }
}

impl Curator {
    /// Create a curator with a custom author denylist.
    pub fn new<I, S>(denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            denylist: denylist
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            min_chars: DEFAULT_MIN_CHARS,
        }
    }

    /// Filter, clean, rank, and truncate a comment set.
    ///
    /// Every returned comment passed all predicates: non-removed, authored
    /// by a non-denylisted account, score at or above `min_score`, and a
    /// cleaned body of at least the minimum length.
    pub fn curate(&self, comments: &[Comment], limit: usize, min_score: i64) -> CurationResult {
        let examined = comments.len();
        let mut survivors: Vec<Comment> = Vec::new();

        for comment in comments {
            if comment.removed || comment.body.trim().is_empty() {
                continue;
            }
            if self.is_denylisted(comment.author.as_deref()) {
                continue;
            }
            if comment.score < min_score {
                continue;
            }

            let cleaned = clean_body(&comment.body);
            if cleaned.chars().count() < self.min_chars {
                continue;
            }

            let mut kept = comment.clone();
            kept.body = cleaned;
            survivors.push(kept);
        }

        let rejected = examined - survivors.len();

        // Deterministic total order: score descending, earlier comment first
        // on ties.
        survivors.sort_by(|a, b| b.score.cmp(&a.score).then(a.created.cmp(&b.created)));
        survivors.truncate(limit);

        debug!(examined, rejected, kept = survivors.len(), "curated comments");

        CurationResult {
            comments: survivors,
            examined,
            rejected,
        }
    }

    fn is_denylisted(&self, author: Option<&str>) -> bool {
        match author {
            Some(author) => self.denylist.contains(&author.to_lowercase()),
            // Deleted authors are already covered by the removal flag, but
            // a missing handle is never allowed through.
            None => true,
        }
    }
}

/// Clean a comment body for use as story material.
///
/// Strips markdown link syntax (keeping the link text), drops bare URLs and
/// quoted-reply lines, cuts edit-disclosure footers, collapses whitespace,
/// caps repeated symbol runs, and truncates very long bodies.
pub fn clean_body(body: &str) -> String {
    let cut = cut_edit_footer(body);

    let mut lines: Vec<String> = Vec::new();
    for line in cut.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('>') {
            continue;
        }

        let line = strip_markdown_links(line);
        let words: Vec<&str> = line.split_whitespace().filter(|w| !is_bare_url(w)).collect();
        if !words.is_empty() {
            lines.push(words.join(" "));
        }
    }

    let cleaned = cap_symbol_runs(&lines.join("\n"));
    truncate_chars(&cleaned, MAX_BODY_CHARS)
}

/// Cut the body at the first edit-disclosure marker.
fn cut_edit_footer(body: &str) -> &str {
    let mut end = body.len();
    for marker in ["EDIT:", "Edit:", "edit:"] {
        if let Some(pos) = body.find(marker) {
            end = end.min(pos);
        }
    }
    body[..end].trim_end()
}

/// Replace `[text](url)` with `text`. Unbalanced syntax is left as-is.
fn strip_markdown_links(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let Some(close_rel) = rest[open..].find("](") else {
            break;
        };
        let close = open + close_rel;
        let Some(paren_rel) = rest[close..].find(')') else {
            break;
        };
        let paren = close + paren_rel;

        out.push_str(&rest[..open]);
        out.push_str(&rest[open + 1..close]);
        rest = &rest[paren + 1..];
    }
    out.push_str(rest);
    out
}

fn is_bare_url(word: &str) -> bool {
    word.starts_with("http://") || word.starts_with("https://") || word.starts_with("www.")
}

/// Cap runs of a repeated non-alphanumeric character (e.g. "!!!!!!").
fn cap_symbol_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run_char: Option<char> = None;
    let mut run_len = 0usize;

    for c in text.chars() {
        if !c.is_alphanumeric() && !c.is_whitespace() && Some(c) == run_char {
            run_len += 1;
            if run_len > MAX_SYMBOL_RUN {
                continue;
            }
        } else {
            run_char = Some(c);
            run_len = 1;
        }
        out.push(c);
    }
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn comment(id: &str, author: &str, body: &str, score: i64, created_offset: i64) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: "post1".to_string(),
            author: Some(author.to_string()),
            body: body.to_string(),
            score,
            created: Utc.timestamp_opt(1_700_000_000 + created_offset, 0).unwrap(),
            removed: false,
        }
    }

    const GOOD_BODY: &str = "This is a perfectly reasonable comment with plenty of substance.";

    #[test]
    fn test_curate_orders_by_score_then_age() {
        let comments = vec![
            comment("c3", "alice", GOOD_BODY, 30, 0),
            comment("c1", "bob", GOOD_BODY, 50, 10),
            comment("late", "carol", GOOD_BODY, 30, 5),
        ];

        let result = Curator::default().curate(&comments, 10, 0);
        let ids: Vec<&str> = result.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3", "late"]);
    }

    #[test]
    fn test_curate_respects_limit_and_min_score() {
        let comments: Vec<Comment> = (0..8)
            .map(|i| comment(&format!("c{i}"), "user", GOOD_BODY, i * 10, i))
            .collect();

        let result = Curator::default().curate(&comments, 3, 30);
        assert_eq!(result.len(), 3);
        assert!(result.comments.iter().all(|c| c.score >= 30));
        assert_eq!(result.examined, 8);
    }

    #[test]
    fn test_curate_rejects_removed_denylisted_and_short() {
        let mut removed = comment("r", "dave", GOOD_BODY, 100, 0);
        removed.removed = true;

        let comments = vec![
            removed,
            comment("bot", "AutoModerator", GOOD_BODY, 100, 1),
            comment("bot2", "automoderator", GOOD_BODY, 100, 2),
            comment("short", "erin", "lol", 100, 3),
            comment("ok", "frank", GOOD_BODY, 10, 4),
        ];

        let result = Curator::default().curate(&comments, 10, 0);
        assert_eq!(result.len(), 1);
        assert_eq!(result.comments[0].id, "ok");
        assert_eq!(result.rejected, 4);
    }

    #[test]
    fn test_curate_rejects_deleted_author() {
        let mut c = comment("c", "x", GOOD_BODY, 100, 0);
        c.author = None;

        let result = Curator::default().curate(&[c], 10, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_curate_is_deterministic() {
        let comments: Vec<Comment> = (0..20)
            .map(|i| comment(&format!("c{i}"), "user", GOOD_BODY, (i % 5) * 10, i))
            .collect();

        let curator = Curator::default();
        let a = curator.curate(&comments, 5, 0);
        let b = curator.curate(&comments, 5, 0);

        let ids_a: Vec<&String> = a.comments.iter().map(|c| &c.id).collect();
        let ids_b: Vec<&String> = b.comments.iter().map(|c| &c.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_clean_strips_links_and_urls() {
        let body = "Check [this article](https://example.com/a) and https://example.com/b too";
        assert_eq!(clean_body(body), "Check this article and too");
    }

    #[test]
    fn test_clean_drops_quotes_and_edit_footer() {
        let body = "> what someone else said\nMy actual story about the wedding day.\n\nEDIT: thanks for the gold!";
        assert_eq!(clean_body(body), "My actual story about the wedding day.");
    }

    #[test]
    fn test_clean_collapses_whitespace_and_symbol_runs() {
        let body = "So    much     drama!!!!!!!";
        assert_eq!(clean_body(body), "So much drama!!!");
    }

    #[test]
    fn test_clean_truncates_long_bodies() {
        let body = "a ".repeat(2000);
        let cleaned = clean_body(&body);
        assert!(cleaned.chars().count() <= MAX_BODY_CHARS + 3);
        assert!(cleaned.ends_with("..."));
    }
}
