// src/cities/cache.rs
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Process-wide response cache keyed by request URL. TTL expiry only; there
/// is no size bound, so a long-running process grows with distinct URLs.
/// Owned by `AppState` and passed in explicitly so tests can drive the clock.
pub struct ResponseCache {
    ttl_secs: i64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    value: Value,
    expires_at: i64,
}

impl ResponseCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str, now: i64) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: &str, value: Value, now: i64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value,
                    expires_at: now + self.ttl_secs,
                },
            );
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
