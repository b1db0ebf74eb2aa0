//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::cache::ContentCache;
use crate::config::Config;
use crate::pipeline::GistPipeline;
use crate::render::FormatRenderer;
use crate::upstream::{GistSource, MarkdownService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    cache: ContentCache,
    pipeline: GistPipeline,
}

impl AppState {
    /// Create a new application state
    ///
    /// The cache is sized from the configuration and starts empty.
    pub fn new(
        config: Config,
        db: SqlitePool,
        source: Arc<dyn GistSource>,
        markdown: Arc<dyn MarkdownService>,
    ) -> Self {
        let cache = ContentCache::with_capacity(config.cache.capacity);
        let pipeline = GistPipeline::new(source, FormatRenderer::new(markdown), db.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                cache,
                pipeline,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the content cache
    pub fn cache(&self) -> &ContentCache {
        &self.inner.cache
    }

    /// Get the gist pipeline
    pub fn pipeline(&self) -> &GistPipeline {
        &self.inner.pipeline
    }
}
