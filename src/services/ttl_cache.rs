//! TTL cache store.
//!
//! A process-lifetime key/value store with per-entry expiry, backed by a
//! sharded concurrent map. Each shard has its own lock, so writers to the
//! same key serialize while unrelated keys proceed without contention.
//!
//! Expired entries are logically absent: `get` never returns them and removes
//! them lazily. `purge_expired` is available for an explicit sweep.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::domain::ports::{Clock, SystemClock};

/// A stored value with its write time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Age at `now`. Clock skew that puts `stored_at` in the future counts as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or_default()
    }

    /// Valid iff `now - stored_at < ttl`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now) < self.ttl
    }
}

/// Introspection record for a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryStats {
    pub key: String,
    pub age_seconds: u64,
    pub remaining_seconds: u64,
    pub expired: bool,
}

/// Point-in-time view of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Physically present entries, expired ones included.
    pub count: usize,
    /// Entries that `get` would still return.
    pub live_count: usize,
    pub ttl_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
    /// Sorted by key.
    pub entries: Vec<CacheEntryStats>,
}

/// Concurrent TTL cache.
pub struct CacheStore<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheStore<V> {
    /// Create an unbounded store on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create an unbounded store reading time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: None,
            clock,
        }
    }

    /// Bound the store. Inserting a new key into a full store drops expired
    /// entries first, then the oldest entry. The bound is approximate under
    /// concurrent inserts of distinct new keys.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Physical entry count, expired entries included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed as a side effect, unless a concurrent `set`
    /// refreshed it in the meantime.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live_at(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| !entry.is_live_at(now));
            trace!(key, "evicted expired cache entry on lookup");
        }
        None
    }

    /// Store `value` under `key`, stamping the current time. Always overwrites.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();

        if let Some(max) = self.max_entries {
            if self.entries.len() >= max && !self.entries.contains_key(&key) {
                self.make_room(max, now);
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl: self.ttl,
            },
        );
    }

    /// Remove one entry, or every entry when `key` is `None`. Returns how many were removed.
    pub fn clear(&self, key: Option<&str>) -> usize {
        match key {
            Some(key) => usize::from(self.entries.remove(key).is_some()),
            None => {
                let mut removed = 0;
                self.entries.retain(|_, _| {
                    removed += 1;
                    false
                });
                removed
            }
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live_at(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Read-only snapshot. Never evicts.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut entries: Vec<CacheEntryStats> = self
            .entries
            .iter()
            .map(|item| {
                let entry = item.value();
                let age = entry.age_at(now);
                CacheEntryStats {
                    key: item.key().clone(),
                    age_seconds: age.as_secs(),
                    remaining_seconds: entry.ttl.saturating_sub(age).as_secs(),
                    expired: !entry.is_live_at(now),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            count: entries.len(),
            live_count: entries.iter().filter(|e| !e.expired).count(),
            ttl_seconds: self.ttl.as_secs(),
            max_entries: self.max_entries,
            entries,
        }
    }

    fn make_room(&self, max: usize, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| entry.is_live_at(now));

        while self.entries.len() >= max {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|item| item.value().stored_at)
                .map(|item| item.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    trace!(key = %key, "evicted oldest cache entry at capacity");
                }
                None => break,
            }
        }
    }
}
