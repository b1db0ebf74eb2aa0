//! Ephemeral serving cache
//!
//! Holds serialized gist payloads for a short, fixed time so repeat requests
//! skip the durable store. Entries expire at an absolute deadline set on
//! write; a read after the deadline is a miss. Capacity is bounded with LRU
//! eviction on top of expiry.
//!
//! The cache is never consulted by the pipeline's durable path, so a cached
//! payload can lag the stored record until it expires.
//!
//! # Thread Safety
//!
//! A `parking_lot::Mutex` guards the map; no lock is held across an await.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Lifetime of every cached payload, in seconds
pub const CACHE_TTL_SECS: u64 = 60;

const DEFAULT_CAPACITY: usize = 1024;

/// One cached payload
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    ttl_seconds: u64,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
}

/// TTL-bounded cache of serialized payloads keyed by gist id
#[derive(Clone)]
pub struct ContentCache {
    entries: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ContentCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Cached payload for `key`, if present and not expired
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let lookup = entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` for `ttl_seconds`, replacing any previous entry
    pub fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) {
        let entry = CacheEntry {
            value,
            ttl_seconds,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        };
        self.entries.lock().put(key.to_string(), entry);
    }

    /// Whole seconds until `key` expires, or `None` if it is missing or expired
    pub fn remaining_ttl(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let entry = entries.peek(key).filter(|e| e.is_live(now))?;
        let remaining = entry.expires_at.saturating_duration_since(now).as_secs();
        Some(remaining.min(entry.ttl_seconds))
    }

    /// Drop every entry
    pub fn flush_all(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        tracing::info!(count = count, "Flushed content cache");
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
