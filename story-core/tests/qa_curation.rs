//! QA tests for comment curation invariants.
//!
//! Sweeps generated comment sets through the curator and checks the
//! contract: bounded output, every survivor passes every predicate, and
//! identical inputs always produce identical output.

use chrono::{TimeZone, Utc};
use reddit::Comment;
use story_core::curate::Curator;

/// Deterministic comment sets with varied scores, bodies, authors, and
/// removal flags.
fn generated_comments(count: usize) -> Vec<Comment> {
    (0..count)
        .map(|i| {
            let body = match i % 5 {
                0 => "lol".to_string(),
                1 => format!("A respectable anecdote about event number {i}, told at length."),
                2 => format!("> quoted reply\nAn actual reply underneath the quote, number {i}."),
                3 => String::new(),
                _ => format!("Someone recounts the strangest thing they saw, version {i}."),
            };
            let author = if i % 7 == 0 {
                "AutoModerator".to_string()
            } else {
                format!("user_{i}")
            };
            Comment {
                id: format!("c{i}"),
                post_id: "post".to_string(),
                author: Some(author),
                body,
                score: ((i as i64) * 13) % 97 - 10,
                created: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                removed: i % 11 == 0,
            }
        })
        .collect()
}

#[test]
fn test_curation_invariants_hold_across_inputs() {
    let curator = Curator::default();

    for count in [0, 1, 7, 25, 80] {
        for limit in [1, 5, 10] {
            for min_score in [0, 10, 40] {
                let comments = generated_comments(count);
                let result = curator.curate(&comments, limit, min_score);

                assert!(result.len() <= limit);
                assert_eq!(result.examined, count);

                for survivor in &result.comments {
                    assert!(survivor.score >= min_score);
                    assert!(!survivor.removed);
                    assert!(survivor.body.chars().count() >= 20);
                    let author = survivor.author.as_deref().unwrap();
                    assert!(!author.eq_ignore_ascii_case("automoderator"));
                }

                // Rank-stable: score descending, earlier first on ties.
                for pair in result.comments.windows(2) {
                    assert!(
                        pair[0].score > pair[1].score
                            || (pair[0].score == pair[1].score
                                && pair[0].created <= pair[1].created)
                    );
                }
            }
        }
    }
}

#[test]
fn test_curation_is_deterministic() {
    let curator = Curator::default();
    let comments = generated_comments(60);

    let first = curator.curate(&comments, 5, 10);
    let second = curator.curate(&comments, 5, 10);

    let ids =
        |r: &story_core::curate::CurationResult| r.comments.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.rejected, second.rejected);
}

#[test]
fn test_all_filtered_yields_empty_result() {
    let curator = Curator::default();
    let mut comments = generated_comments(10);
    for comment in &mut comments {
        comment.removed = true;
    }

    let result = curator.curate(&comments, 5, 0);
    assert!(result.is_empty());
    assert_eq!(result.rejected, 10);
}
