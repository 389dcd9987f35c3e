//! Narrative style profiles.
//!
//! Styles are a closed table of directives: a tone description embedded in
//! the prompt, a phrasing addon for the system message, a title prefix for
//! derived titles, and a target word-count range. Adding a style is a data
//! change here, not a branch anywhere else.

use crate::error::StoryError;

/// A named narrative style with its generation directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleProfile {
    pub name: &'static str,
    /// One-line tone description, embedded in the prompt instructions.
    pub tone: &'static str,
    /// Style-specific phrasing instruction appended to the system message.
    pub phrasing: &'static str,
    /// Prefix used when deriving a story title from the post title.
    pub title_prefix: &'static str,
    pub min_words: usize,
    pub max_words: usize,
}

/// The closed set of supported styles.
pub const STYLES: &[StyleProfile] = &[
    StyleProfile {
        name: "engaging",
        tone: "A balanced, engaging narrative",
        phrasing: "Write in an engaging, accessible style that draws the reader in.",
        title_prefix: "The Story of",
        min_words: 300,
        max_words: 500,
    },
    StyleProfile {
        name: "comedy",
        tone: "Humorous and light-hearted",
        phrasing: "Write with humor and wit, finding the funny side of the situation.",
        title_prefix: "The Hilarious Tale of",
        min_words: 300,
        max_words: 500,
    },
    StyleProfile {
        name: "drama",
        tone: "Emotional and character-driven",
        phrasing: "Create a dramatic narrative focusing on emotions and character development.",
        title_prefix: "The Dramatic Story of",
        min_words: 300,
        max_words: 500,
    },
    StyleProfile {
        name: "documentary",
        tone: "Factual and journalistic",
        phrasing: "Present the story in a documentary style, as if narrating real events.",
        title_prefix: "The True Account of",
        min_words: 300,
        max_words: 500,
    },
    StyleProfile {
        name: "wholesome",
        tone: "Uplifting and positive",
        phrasing: "Focus on the heartwarming and positive aspects, creating an uplifting narrative.",
        title_prefix: "The Heartwarming Story of",
        min_words: 300,
        max_words: 500,
    },
    StyleProfile {
        name: "thriller",
        tone: "Suspenseful and tense",
        phrasing: "Build suspense and tension throughout the narrative.",
        title_prefix: "The Suspenseful Tale of",
        min_words: 300,
        max_words: 500,
    },
];

/// Look up a style by name, case-insensitive.
pub fn lookup(name: &str) -> Result<&'static StyleProfile, StoryError> {
    STYLES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| StoryError::InvalidStyle(name.to_string()))
}

/// Names of all supported styles, in table order.
pub fn style_names() -> impl Iterator<Item = &'static str> {
    STYLES.iter().map(|s| s.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_styles() {
        for style in STYLES {
            assert_eq!(lookup(style.name).unwrap().name, style.name);
        }
    }

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(lookup("Comedy").unwrap().name, "comedy");
        assert_eq!(lookup("DRAMA").unwrap().name, "drama");
    }

    #[test]
    fn test_lookup_unknown_style() {
        let err = lookup("noir").unwrap_err();
        assert!(matches!(err, StoryError::InvalidStyle(_)));
    }

    #[test]
    fn test_word_ranges_valid() {
        for style in STYLES {
            assert!(style.min_words > 0, "{} min must be positive", style.name);
            assert!(
                style.min_words <= style.max_words,
                "{} range inverted",
                style.name
            );
        }
    }
}
