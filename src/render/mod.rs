//! Per-file rendering
//!
//! Each gist file is classified by its declared language and rendered to HTML:
//!
//! - Markdown (and plain text) through the remote GitHub-flavored renderer
//! - reStructuredText locally, on the blocking pool
//! - anything else is skipped
//!
//! Both HTML outputs go through the typographic pass. A file that fails to
//! render is logged and dropped; it never fails the whole gist.

pub mod rst;
pub mod smartypants;

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use crate::models::RenderedFile;
use crate::upstream::{MarkdownService, RawFile};

/// Per-file rendering failures. Never surfaced to clients.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The Markdown service answered with a non-success status
    #[error("Markdown service returned status {0}")]
    Upstream(u16),

    /// The Markdown service could not be reached
    #[error("Markdown service request failed: {0}")]
    Transport(String),

    /// Local rendering failed
    #[error("Local render failed: {0}")]
    Local(String),
}

/// Source format of a gist file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markdown,
    RestructuredText,
    Unsupported,
}

/// Classify a file by its declared language. Files with no declared language
/// are treated as Markdown.
pub fn classify(language: Option<&str>) -> Format {
    match language {
        None | Some("Text" | "Markdown" | "Literate CoffeeScript") => Format::Markdown,
        Some("reStructuredText") => Format::RestructuredText,
        Some(_) => Format::Unsupported,
    }
}

/// Renders gist files to HTML
#[derive(Clone)]
pub struct FormatRenderer {
    markdown: Arc<dyn MarkdownService>,
}

impl FormatRenderer {
    pub fn new(markdown: Arc<dyn MarkdownService>) -> Self {
        Self { markdown }
    }

    /// Render one file's content in the given format.
    ///
    /// Returns `None` for unsupported formats and for failed renders.
    pub async fn render(&self, file: &RawFile, format: Format) -> Option<String> {
        match self.try_render(file, format).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(filename = %file.filename, "Render failed: {}", e);
                None
            }
        }
    }

    async fn try_render(&self, file: &RawFile, format: Format) -> Result<Option<String>, RenderError> {
        let html = match format {
            Format::Unsupported => return Ok(None),
            Format::Markdown => self.markdown.render_markdown(&file.content).await?,
            Format::RestructuredText => {
                let content = file.content.clone();
                tokio::task::spawn_blocking(move || rst::render_fragment(&content))
                    .await
                    .map_err(|e| RenderError::Local(e.to_string()))??
            }
        };
        Ok(Some(smartypants::educate(&html)?))
    }

    /// Classify and render one file into a stored record
    pub async fn render_file(&self, file: &RawFile) -> Option<RenderedFile> {
        let format = classify(file.language.as_deref());
        let rendered_html = self.render(file, format).await?;

        Some(RenderedFile {
            filename: file.filename.clone(),
            language: file.language.clone(),
            raw_content: file.content.clone(),
            rendered_html,
        })
    }

    /// Render every file concurrently. The result keeps input order, minus the
    /// files that were skipped or failed.
    pub async fn render_all(&self, gist_id: &str, files: &[RawFile]) -> Vec<RenderedFile> {
        let rendered = join_all(files.iter().map(|file| self.render_file(file))).await;
        let kept: Vec<RenderedFile> = rendered.into_iter().flatten().collect();

        tracing::debug!(
            gist_id = %gist_id,
            total = files.len(),
            rendered = kept.len(),
            "Rendered gist files"
        );
        kept
    }
}
