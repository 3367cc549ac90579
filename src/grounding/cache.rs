//! Short-lived cache keyed by location name
//!
//! Bounds request volume to the geocoding and weather services. Entries are
//! never mutated once written; an expired entry is simply replaced by the
//! next insert. Clones share the same map, so one cache can serve every
//! session.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    cached_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.cached_at >= ttl
    }
}

/// TTL cache keyed by normalized location name
#[derive(Debug, Clone)]
pub struct LocationCache<V> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
}

/// TTL used when the configured one does not fit a duration
const FALLBACK_TTL_SECS: i64 = 300;

impl<V: Clone> LocationCache<V> {
    /// A TTL of zero disables caching
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or_else(|| {
                    warn!("Cache TTL of {}s is out of range, using {}s", ttl_secs, FALLBACK_TTL_SECS);
                    Duration::seconds(FALLBACK_TTL_SECS)
                }),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, location: &str) -> Option<V> {
        self.get_at(location, Utc::now())
    }

    pub fn get_at(&self, location: &str, now: DateTime<Utc>) -> Option<V> {
        let key = normalize(location);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&key)?;
        if entry.is_expired(self.ttl, now) {
            return None;
        }
        debug!("Cache hit for location: {}", key);
        Some(entry.value.clone())
    }

    pub fn insert(&self, location: &str, value: V) {
        self.insert_at(location, value, Utc::now());
    }

    pub fn insert_at(&self, location: &str, value: V, now: DateTime<Utc>) {
        if self.ttl <= Duration::zero() {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Drop stale entries so the map stays bounded by live locations
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        entries.insert(
            normalize(location),
            CacheEntry {
                value,
                cached_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key: trimmed, lower-cased, inner whitespace collapsed
fn normalize(location: &str) -> String {
    location
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
