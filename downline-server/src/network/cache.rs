//! Short-lived response cache for hierarchy reads.
//!
//! Keyed by request fingerprint, TTL-bounded, swept periodically from a
//! background task. Per-instance only; settlement writes are allowed to
//! race reads (reports are eventually consistent).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Fresh cached value, if any. A zero TTL disables caching entirely.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if self.ttl.is_zero() {
            return None;
        }
        let entry = self.inner.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            drop(entry);
            self.inner.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: serde_json::Value) {
        if self.ttl.is_zero() {
            return;
        }
        self.inner.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries.
    pub fn sweep(&self) {
        if self.ttl.is_zero() {
            return;
        }
        self.inner
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_then_sweep_after_expiry() {
        let cache = QueryCache::new(Duration::from_millis(20));
        cache.put("k", serde_json::json!({"a": 1}));
        assert!(cache.get("k").is_some());

        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("k").is_none());
        cache.sweep();
        assert!(cache.inner.is_empty());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.put("k", serde_json::json!(1));
        assert!(cache.get("k").is_none());
    }
}
