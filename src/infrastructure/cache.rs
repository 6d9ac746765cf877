//! Parsed configuration cache.
//!
//! One entry per `(repository, file, commit)`. Entries expire after a TTL
//! and the map is bounded; at capacity the entry with the lowest access
//! count (oldest insertion on ties) is evicted as a coarse LRU proxy.

use crate::domain::value::ConfigValue;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache key; equality is byte-exact on all three components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub repo_url: String,
    pub file_path: String,
    pub commit: String,
}

struct CacheEntry {
    document: ConfigValue,
    inserted_at: Instant,
    // Atomic so hits can count under the read lock without upgrading.
    access_count: AtomicU64,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_size: usize,
    pub ttl_seconds: u64,
    pub total_access: u64,
    pub oldest_entry_age_ms: Option<u64>,
    pub newest_entry_age_ms: Option<u64>,
}

/// Bounded TTL cache for parsed configuration documents.
pub struct ConfigCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_size: usize,
    ttl: Duration,
}

impl ConfigCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size,
            ttl,
        }
    }

    /// Fetch a document copy; `None` on absence or TTL expiry.
    ///
    /// The returned tree is owned by the caller; mutating it cannot affect
    /// later reads.
    pub fn get(&self, key: &CacheKey) -> Option<ConfigValue> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        entry.access_count.fetch_add(1, Ordering::Relaxed);
        Some(entry.document.clone())
    }

    /// Insert a document, evicting one entry first when at capacity.
    pub fn put(&self, key: CacheKey, document: ConfigValue) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            Self::evict_one(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                document,
                inserted_at: Instant::now(),
                access_count: AtomicU64::new(1),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut total_access = 0;
        let mut oldest: Option<Instant> = None;
        let mut newest: Option<Instant> = None;
        for entry in entries.values() {
            total_access += entry.access_count.load(Ordering::Relaxed);
            if oldest.map_or(true, |t| entry.inserted_at < t) {
                oldest = Some(entry.inserted_at);
            }
            if newest.map_or(true, |t| entry.inserted_at > t) {
                newest = Some(entry.inserted_at);
            }
        }

        CacheStats {
            entries: entries.len(),
            max_size: self.max_size,
            ttl_seconds: self.ttl.as_secs(),
            total_access,
            oldest_entry_age_ms: oldest.map(|t| t.elapsed().as_millis() as u64),
            newest_entry_age_ms: newest.map(|t| t.elapsed().as_millis() as u64),
        }
    }

    fn evict_one(entries: &mut HashMap<CacheKey, CacheEntry>) {
        let victim = entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                let accesses_a = a.access_count.load(Ordering::Relaxed);
                let accesses_b = b.access_count.load(Ordering::Relaxed);
                accesses_a
                    .cmp(&accesses_b)
                    .then_with(|| a.inserted_at.cmp(&b.inserted_at))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            debug!(
                repo = %key.repo_url,
                file = %key.file_path,
                commit = %key.commit,
                "evicting least-used cache entry"
            );
            entries.remove(&key);
        }
    }
}
