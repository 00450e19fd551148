//! In-memory store for rendered pages.
//!
//! Entries are never removed. A stale entry stays in the map until the next
//! successful render for its key replaces it.

use std::{collections::HashMap, sync::RwLock, time::Duration};

use bytes::Bytes;
use metrics::gauge;
use tokio::time::Instant;

use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// One rendered page snapshot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub body: Bytes,
    pub inserted_at: Instant,
}

impl CacheEntry {
    /// An entry is servable while `now - inserted_at < ttl`.
    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Process-wide response store keyed by normalized request target.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entry for `key` if it is still fresh.
    pub fn get_fresh(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_fresh_at(key, Instant::now())
    }

    pub fn get_fresh_at(&self, key: &CacheKey, now: Instant) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "get_fresh")
            .get(key)
            .filter(|entry| entry.is_fresh_at(now, self.ttl))
            .cloned()
    }

    /// Stores `body` under `key`, replacing any previous entry wholesale.
    pub fn insert(&self, key: CacheKey, body: Bytes) -> CacheEntry {
        let entry = CacheEntry {
            key: key.clone(),
            body,
            inserted_at: Instant::now(),
        };

        let len = {
            let mut entries = rw_write(&self.entries, SOURCE, "insert");
            entries.insert(key, entry.clone());
            entries.len()
        };
        gauge!("storefront_ssr_cache_entries").set(len as f64);

        entry
    }

    /// Returns the stored entry regardless of freshness.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "peek").get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains_key(key)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
