//! Artifact persistence.
//!
//! Writes each story artifact under a date-keyed directory, one file per
//! requested format. Every write is atomic (write to a temp file, then
//! rename) so a crash or cancellation never leaves a partial file. The
//! JSON form carries full field fidelity and round-trips; markdown is the
//! human-readable rendering with a metadata header.

use crate::artifact::StoryArtifact;
use crate::error::StoryError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, with a metadata header block.
    Markdown,
    /// Machine-readable, full field fidelity.
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

/// Writes story artifacts to durable storage.
pub struct PersistenceWriter {
    root: PathBuf,
}

impl PersistenceWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write the artifact in each requested format.
    ///
    /// The target directory is keyed by generation date and file names by
    /// artifact id, so distinct artifacts never collide and rewriting the
    /// same artifact produces byte-identical files.
    pub async fn write(
        &self,
        artifact: &StoryArtifact,
        formats: &[OutputFormat],
    ) -> Result<Vec<PathBuf>, StoryError> {
        let dir = self
            .root
            .join(artifact.generated_at.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&dir).await?;

        let mut paths = Vec::new();
        // Canonical order keeps output deterministic regardless of how the
        // caller assembled the format set.
        for format in [OutputFormat::Markdown, OutputFormat::Json] {
            if !formats.contains(&format) {
                continue;
            }

            let content = match format {
                OutputFormat::Markdown => render_markdown(artifact),
                OutputFormat::Json => {
                    let mut json = serde_json::to_string_pretty(artifact)?;
                    json.push('\n');
                    json
                }
            };

            let path = dir.join(format!("{}.{}", artifact.id, format.extension()));
            write_atomic(&path, &content).await?;
            paths.push(path);
        }

        info!(artifact_id = %artifact.id, files = paths.len(), "artifact persisted");
        Ok(paths)
    }

    /// Read an artifact back from its JSON form.
    pub async fn read_json(path: impl AsRef<Path>) -> Result<StoryArtifact, StoryError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), StoryError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn render_markdown(artifact: &StoryArtifact) -> String {
    let mut md = format!("# {}\n\n", artifact.title);
    md.push_str(&format!(
        "*Generated from r/{} \u{2022} {} style \u{2022} {} words*\n\n---\n\n",
        artifact.source_post.subreddit, artifact.style, artifact.word_count
    ));
    md.push_str(&artifact.body);
    md.push_str("\n\n---\n\n");
    md.push_str(&format!(
        "**Source:** [{}]({})\n\n",
        artifact.source_post.title, artifact.source_post.url
    ));
    md.push_str(&format!(
        "**Generated:** {} UTC\n",
        artifact.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    md.push_str(&format!("**Backend:** {}\n", artifact.backend_used.as_str()));
    md
}
