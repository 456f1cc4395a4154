use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Default lifetime for cached GET responses (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Build the cache key for an endpoint and its query parameters.
pub fn cache_key(endpoint: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }
    let serialized = serde_json::to_string(params).unwrap_or_default();
    format!("{}{}", endpoint, serialized)
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.stored_at
    }

    /// Trusted while `now - stored_at <= ttl`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        self.age(now) > ttl
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.age(now).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

pub struct CacheManager {
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Bumped by `clear`, only while holding the entries lock
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `data` under `key`, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, data: Value, ttl: Duration) {
        let entry = CacheEntry {
            data,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    /// Like `set`, but only if nothing cleared the cache since `generation`
    /// was read. Returns whether the entry was stored.
    pub fn set_if_generation(&self, key: impl Into<String>, data: Value, ttl: Duration, generation: u64) -> bool {
        let mut entries = self.entries();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        let entry = CacheEntry {
            data,
            stored_at: self.clock.now(),
            ttl,
        };
        entries.insert(key.into(), entry);
        true
    }

    /// Current generation, for use with `set_if_generation`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fresh entry for `key`; a stale one is evicted and `None` returned.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.is_stale(now) => {
                debug!(key = key, "Evicting stale cache entry");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entry(key).map(|entry| entry.data)
    }

    /// Fresh entry deserialized as `T`. A shape mismatch reads as a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.get(key)?;
        match serde_json::from_value(data) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries().remove(key).is_some()
    }

    /// Drop every entry whose key starts with `prefix`; returns how many.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop everything and start a new generation.
    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
