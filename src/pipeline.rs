//! Gist pipeline
//!
//! Resolves a gist id to its stored `(Author, Gist)` pair:
//!
//! 1. look the gist (and its author) up in the durable store
//! 2. on a miss, fetch the raw gist upstream
//! 3. render every file, dropping the ones that cannot be rendered
//! 4. build the records and upsert the author, then the gist
//!
//! Nothing is written before step 4, so a failed fetch leaves the store
//! untouched. Concurrent misses for the same id are coalesced: only the first
//! caller fetches, the rest wait and then read what it stored.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::Mutex;
use sqlx::SqlitePool;

use crate::db::{AuthorRepository, GistRepository};
use crate::error::Result;
use crate::models::{Author, Gist, RenderedFile};
use crate::render::FormatRenderer;
use crate::upstream::{GistSource, RawGist};

/// Per-id locks for in-flight fetches
#[derive(Default)]
struct InFlight {
    locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl InFlight {
    fn lock_for(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(id.to_string(), Arc::downgrade(&lock));
        lock
    }
}

/// Fetch, render and persist gists
#[derive(Clone)]
pub struct GistPipeline {
    inner: Arc<GistPipelineInner>,
}

struct GistPipelineInner {
    source: Arc<dyn GistSource>,
    renderer: FormatRenderer,
    db: SqlitePool,
    in_flight: InFlight,
}

impl GistPipeline {
    pub fn new(source: Arc<dyn GistSource>, renderer: FormatRenderer, db: SqlitePool) -> Self {
        Self {
            inner: Arc::new(GistPipelineInner {
                source,
                renderer,
                db,
                in_flight: InFlight::default(),
            }),
        }
    }

    /// Resolve a gist, fetching and storing it on a durable miss
    pub async fn resolve(&self, id: &str) -> Result<(Author, Gist)> {
        if let Some(found) = self.lookup(id).await? {
            tracing::debug!(gist_id = %id, "Durable store hit");
            return Ok(found);
        }

        let lock = self.inner.in_flight.lock_for(id);
        let _guard = lock.lock().await;

        // Another request may have stored it while we waited
        if let Some(found) = self.lookup(id).await? {
            tracing::debug!(gist_id = %id, "Stored by a concurrent request");
            return Ok(found);
        }

        self.fetch_and_store(id).await
    }

    /// Stored gist and author. A gist whose author row is missing counts as a
    /// miss so the next fetch repairs it.
    async fn lookup(&self, id: &str) -> Result<Option<(Author, Gist)>> {
        let Some(gist) = GistRepository::new(&self.inner.db).get(id).await? else {
            return Ok(None);
        };

        match AuthorRepository::new(&self.inner.db).get(&gist.author_id).await? {
            Some(author) => Ok(Some((author, gist))),
            None => {
                tracing::warn!(gist_id = %id, author_id = %gist.author_id, "Stored gist has no author");
                Ok(None)
            }
        }
    }

    async fn fetch_and_store(&self, id: &str) -> Result<(Author, Gist)> {
        let raw = self.inner.source.fetch(id).await?;
        tracing::info!(gist_id = %id, files = raw.files.len(), "Fetched gist");

        let files = self.inner.renderer.render_all(id, &raw.files).await;
        let (author, gist) = build_records(raw, files);

        AuthorRepository::new(&self.inner.db).upsert(&author).await?;
        GistRepository::new(&self.inner.db).upsert(&gist).await?;

        Ok((author, gist))
    }
}

fn build_records(raw: RawGist, files: Vec<RenderedFile>) -> (Author, Gist) {
    let author = Author {
        id: raw.owner.id,
        login: raw.owner.login,
        avatar_url: raw.owner.avatar_url,
        html_url: raw.owner.html_url,
        account_type: raw.owner.account_type,
        fetched_at: Utc::now(),
    };

    let gist = Gist {
        id: raw.id,
        html_url: raw.html_url,
        public: raw.public,
        description: raw.description,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        author_id: author.id.clone(),
        author_login: author.login.clone(),
        files,
    };

    (author, gist)
}
