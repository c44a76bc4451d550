//! Discovery-side caches
//!
//! Query results live behind a short TTL keyed by a hashed query
//! signature; aggregate network statistics live behind a longer TTL with
//! graceful stale fallback. Entries self-expire on read; writes never
//! invalidate, so a short staleness window after publishing is accepted.

use super::models::{NetworkStatistics, QuerySignature, RemoteWorkflow};
use crate::metrics::METRICS;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    results: Vec<RemoteWorkflow>,
    inserted_at: Instant,
}

/// TTL cache over ranked discovery results
pub struct QueryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_size: usize,
}

impl QueryCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_size,
        }
    }

    /// Stable key for a query signature
    pub fn key(signature: &QuerySignature) -> String {
        let serialized = serde_json::to_string(signature).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, signature: &QuerySignature) -> Option<Vec<RemoteWorkflow>> {
        let key = Self::key(signature);
        let mut entries = self.entries.lock().unwrap();

        if let Some(entry) = entries.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                METRICS.discovery_cache_hits.inc();
                return Some(entry.results.clone());
            }
            entries.remove(&key);
        }

        METRICS.discovery_cache_misses.inc();
        None
    }

    pub fn store(&self, signature: &QuerySignature, results: Vec<RemoteWorkflow>) {
        let key = Self::key(signature);
        let mut entries = self.entries.lock().unwrap();

        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                results,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear_expired(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single-slot cache for aggregate network statistics
///
/// Keeps the last known value even past its TTL so a failed refresh can
/// fall back to stale data instead of nothing.
pub struct StatsCache {
    slot: Mutex<Option<(NetworkStatistics, Instant)>>,
    ttl: Duration,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Value still within its TTL
    pub fn get_fresh(&self) -> Option<NetworkStatistics> {
        let slot = self.slot.lock().unwrap();
        slot.as_ref()
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(stats, _)| stats.clone())
    }

    /// Last known value regardless of age; never touches the network
    pub fn get_any(&self) -> Option<NetworkStatistics> {
        let slot = self.slot.lock().unwrap();
        slot.as_ref().map(|(stats, _)| stats.clone())
    }

    pub fn store(&self, stats: NetworkStatistics) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some((stats, Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(capability: &str) -> QuerySignature {
        QuerySignature {
            capability: Some(capability.to_string()),
            limit: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_store_and_get() {
        let cache = QueryCache::new(Duration::from_secs(60), 10);
        cache.store(&signature("a"), vec![]);
        assert!(cache.get(&signature("a")).is_some());
        assert!(cache.get(&signature("b")).is_none());
    }

    #[test]
    fn test_expiry() {
        let cache = QueryCache::new(Duration::from_millis(50), 10);
        cache.store(&signature("a"), vec![]);
        std::thread::sleep(Duration::from_millis(80));
        assert!(cache.get(&signature("a")).is_none());
    }

    #[test]
    fn test_eviction_at_capacity() {
        let cache = QueryCache::new(Duration::from_secs(60), 2);
        cache.store(&signature("a"), vec![]);
        cache.store(&signature("b"), vec![]);
        cache.store(&signature("c"), vec![]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_distinct_signatures_distinct_keys() {
        let a = QueryCache::key(&signature("a"));
        let b = QueryCache::key(&signature("b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_stats_stale_fallback() {
        let cache = StatsCache::new(Duration::from_millis(30));
        cache.store(NetworkStatistics {
            total_hubs: 3,
            ..Default::default()
        });

        assert_eq!(cache.get_fresh().unwrap().total_hubs, 3);
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get_fresh().is_none());
        assert_eq!(cache.get_any().unwrap().total_hubs, 3);
    }
}
