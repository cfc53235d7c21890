//! TTL-bounded cache for read operation responses.

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::config::schema::CacheConfig;
use crate::observability::metrics;

/// Cache key for a request: operation, canonical parameters, and the
/// client subject (per-client partition). Parameter maps serialize with
/// sorted keys, so equal parameter sets produce equal fingerprints
/// regardless of insertion order.
pub fn fingerprint(operation: &str, params: &Map<String, Value>, subject: &str) -> String {
    let params = serde_json::to_string(params).unwrap_or_default();
    format!("{subject}:{operation}:{params}")
}

struct CacheEntry {
    payload: Value,
    inserted_at: u64,
}

/// Thread-safe response cache with lazy TTL expiry and a bounded entry
/// count. Only the dispatcher writes to it, and only for successful
/// read-operation responses.
pub struct ResponseCache {
    enabled: bool,
    ttl_secs: u64,
    max_entries: usize,
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl_secs: config.ttl_secs,
            max_entries: config.max_entries,
            entries: DashMap::new(),
        }
    }

    /// Look up a fingerprint at the given unix time. An entry at or past
    /// its TTL is removed and reported absent — stale data is never
    /// returned. A disabled cache always misses.
    pub fn get(&self, key: &str, now: u64) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if now.saturating_sub(entry.inserted_at) < self.ttl_secs {
                metrics::record_cache_hit();
                return Some(entry.payload.clone());
            }
            drop(entry);
            self.entries.remove(key);
        }

        metrics::record_cache_miss();
        None
    }

    /// Store a payload. A disabled cache makes this a no-op. At capacity,
    /// expired entries are swept first; if that is not enough, the oldest
    /// entries by insertion time are evicted.
    pub fn put(&self, key: String, payload: Value, now: u64) {
        if !self.enabled {
            return;
        }

        if self.entries.len() >= self.max_entries {
            self.entries
                .retain(|_, entry| now.saturating_sub(entry.inserted_at) < self.ttl_secs);
        }
        if self.entries.len() >= self.max_entries {
            self.evict_oldest(self.entries.len() + 1 - self.max_entries);
        }

        self.entries.insert(key, CacheEntry { payload, inserted_at: now });
        metrics::record_cache_size(self.entries.len());
    }

    fn evict_oldest(&self, excess: usize) {
        let mut by_age: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().inserted_at))
            .collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
        for (key, _) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}
