//! Upstream provider traits
//!
//! The pipeline and renderer only see these traits, so tests can swap the
//! GitHub API for in-memory fakes.

use async_trait::async_trait;

use super::types::{FetchError, RawGist};
use crate::render::RenderError;

/// Source of raw gists
#[async_trait]
pub trait GistSource: Send + Sync {
    /// Fetch one gist by id. Single attempt, no retries.
    async fn fetch(&self, id: &str) -> Result<RawGist, FetchError>;
}

/// Remote GitHub-flavored Markdown renderer
#[async_trait]
pub trait MarkdownService: Send + Sync {
    async fn render_markdown(&self, text: &str) -> Result<String, RenderError>;
}
