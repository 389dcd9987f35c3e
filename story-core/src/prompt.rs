//! Prompt assembly.
//!
//! Combines a post, its curated comments, and a narrative style into a
//! single generation request. Assembly is a pure function: identical
//! inputs yield byte-identical prompt text, which keeps requests cacheable
//! and testable.

use crate::curate::CurationResult;
use crate::error::StoryError;
use crate::llm::BackendKind;
use crate::style::{self, StyleProfile};
use reddit::Post;
use std::fmt::Write;

/// Comments longer than this are shortened when embedded in the prompt.
const PROMPT_COMMENT_CHARS: usize = 500;

/// Rough token budget per target word, with headroom for the backend.
const TOKENS_PER_WORD: usize = 3;

/// A composed generation request. Immutable; built once per story attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System message naming the storyteller role and style phrasing.
    pub system: String,
    /// The full user prompt: preamble, post title, labelled comments,
    /// instructions.
    pub prompt: String,
    pub style: &'static StyleProfile,
    /// The backend this request targets, resolved at startup.
    pub backend: BackendKind,
    /// Max-token budget derived from the style's word-count range.
    pub max_tokens: usize,
}

impl GenerationRequest {
    /// Rough token estimate for the composed request (1 token per 4 chars).
    pub fn token_estimate(&self) -> usize {
        (self.system.len() + self.prompt.len()) / 4
    }
}

/// Builds generation requests for a fixed target backend.
pub struct PromptAssembler {
    backend: BackendKind,
}

impl PromptAssembler {
    pub fn new(backend: BackendKind) -> Self {
        Self { backend }
    }

    /// Assemble a generation request from a post, curated comments, and a
    /// style name.
    ///
    /// Fails with `InvalidStyle` for names outside the style table and with
    /// `NoEligibleContent` when curation produced nothing, both before any
    /// network call is possible.
    pub fn assemble(
        &self,
        post: &Post,
        curation: &CurationResult,
        style_name: &str,
    ) -> Result<GenerationRequest, StoryError> {
        let style = style::lookup(style_name)?;
        if curation.is_empty() {
            return Err(StoryError::NoEligibleContent {
                post_id: post.id.clone(),
            });
        }

        let system = format!(
            "You are a creative storyteller who transforms Reddit posts and comments \
             into engaging narrative stories. You excel at weaving multiple perspectives \
             into cohesive tales while maintaining the essence of the original content. {}",
            style.phrasing
        );

        let mut prompt = format!(
            "Transform this Reddit post and its top comments into a {} story.\n\n\
             **Reddit Post from r/{}:**\n\"{}\"\n\n\
             **Top Comments from the community:**\n",
            style.name, post.subreddit, post.title
        );

        for (i, comment) in curation.comments.iter().enumerate() {
            let text = shorten(&comment.body, PROMPT_COMMENT_CHARS);
            let _ = write!(prompt, "\n{}. {}\n", i + 1, text);
        }

        let _ = write!(
            prompt,
            "\n\n**Instructions:**\n\
             - Create a cohesive narrative that naturally incorporates perspectives from all comments\n\
             - The story should flow smoothly, not just list the comments\n\
             - Maintain the spirit and tone of the original content\n\
             - Write in third person unless first person serves the narrative better\n\
             - Length: {}-{} words\n\
             - Style: {}\n\n\
             Begin the story:",
            style.min_words, style.max_words, style.tone
        );

        Ok(GenerationRequest {
            system,
            prompt,
            style,
            backend: self.backend,
            max_tokens: style.max_words * TOKENS_PER_WORD,
        })
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
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
    use crate::curate::Curator;
    use crate::testing::{sample_comments, sample_post};

    fn curated() -> CurationResult {
        Curator::default().curate(&sample_comments(&[50, 40, 30]), 5, 0)
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let assembler = PromptAssembler::new(BackendKind::Anthropic);
        let post = sample_post();
        let curation = curated();

        let a = assembler.assemble(&post, &curation, "comedy").unwrap();
        let b = assembler.assemble(&post, &curation, "comedy").unwrap();
        assert_eq!(a.prompt, b.prompt);
        assert_eq!(a.system, b.system);
    }

    #[test]
    fn test_assemble_contains_all_parts() {
        let assembler = PromptAssembler::new(BackendKind::Anthropic);
        let post = sample_post();
        let curation = curated();

        let request = assembler.assemble(&post, &curation, "comedy").unwrap();

        assert!(request.prompt.contains(&post.title));
        for (i, comment) in curation.comments.iter().enumerate() {
            assert!(request.prompt.contains(&comment.body));
            assert!(request.prompt.contains(&format!("\n{}. ", i + 1)));
        }
        assert!(request.prompt.contains("Length: 300-500 words"));
        assert!(request.system.contains("humor"));
        assert_eq!(request.max_tokens, 500 * TOKENS_PER_WORD);
    }

    #[test]
    fn test_assemble_rejects_unknown_style() {
        let assembler = PromptAssembler::new(BackendKind::Anthropic);
        let err = assembler
            .assemble(&sample_post(), &curated(), "noir")
            .unwrap_err();
        assert!(matches!(err, StoryError::InvalidStyle(_)));
    }

    #[test]
    fn test_assemble_rejects_empty_curation() {
        let assembler = PromptAssembler::new(BackendKind::Anthropic);
        let empty = Curator::default().curate(&[], 5, 0);
        let err = assembler
            .assemble(&sample_post(), &empty, "comedy")
            .unwrap_err();
        assert!(matches!(err, StoryError::NoEligibleContent { .. }));
    }

    #[test]
    fn test_long_comments_are_shortened() {
        let long = "x".repeat(600);
        assert!(shorten(&long, PROMPT_COMMENT_CHARS).chars().count() <= PROMPT_COMMENT_CHARS + 3);
        assert_eq!(shorten("short", PROMPT_COMMENT_CHARS), "short");
    }
}
