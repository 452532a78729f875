//! Short-TTL in-memory cache of metadata resolution results
//!
//! Avoids redundant resolver calls for the same URL within a time window.
//! Entries older than the TTL are treated as absent and removed lazily on
//! lookup; [`MetadataCache::purge_expired`] sweeps the rest opportunistically
//! (the engine calls it every K completed jobs).

use crate::types::Metadata;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    metadata: Metadata,
    fetched_at: Instant,
}

/// TTL-bounded metadata cache keyed by source URL
pub struct MetadataCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MetadataCache {
    /// Create an empty cache with the given entry TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a non-expired entry, removing it if it has expired
    pub fn get(&self, url: &str) -> Option<Metadata> {
        let mut entries = self.lock_entries();
        match entries.get(url) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Some(entry.metadata.clone()),
            Some(_) => {
                // Stale; lazily purge so the map doesn't accumulate dead entries
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    /// Store a resolution result, stamped with the current time
    pub fn insert(&self, url: &str, metadata: Metadata) {
        self.lock_entries().insert(
            url.to_string(),
            CacheEntry {
                metadata,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Sweep all expired entries
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.lock_entries()
            .retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    }

    /// Number of entries currently held (including any not yet swept)
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
