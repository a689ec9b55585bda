//! Schedule cache for avoiding redundant schedule computation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use hdf_core::{CacheCapacity, ExternalRates, RateKey, Schedule, Solution};
use serde::Serialize;

/// Least-recently-used cache of schedules keyed by rate configuration.
///
/// `entries` and `recency` always hold the same key set. The front of
/// `recency` is the most recently used key.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    /// Maximum number of retained entries.
    capacity: CacheCapacity,

    /// Cached schedules by rate key.
    entries: HashMap<RateKey, CacheEntry>,

    /// Keys ordered from most to least recently used.
    recency: VecDeque<RateKey>,
}

/// A cached schedule together with the external rates it induces.
///
/// Both values are immutable once stored; clones share them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Firing schedule for the rate configuration.
    pub schedule: Arc<Schedule>,

    /// Rates of the unit's own boundary ports under this schedule.
    pub external_rates: Arc<ExternalRates>,
}

impl From<Solution> for CacheEntry {
    fn from(solution: Solution) -> Self {
        Self {
            schedule: Arc::new(solution.schedule),
            external_rates: Arc::new(solution.external_rates),
        }
    }
}

impl ScheduleCache {
    /// Creates an empty cache.
    pub fn new(capacity: CacheCapacity) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Returns the capacity.
    pub fn capacity(&self) -> CacheCapacity {
        self.capacity
    }

    /// Changes the capacity. A different capacity clears the cache; returns
    /// whether that happened.
    pub fn set_capacity(&mut self, capacity: CacheCapacity) -> bool {
        if capacity == self.capacity {
            return false;
        }

        tracing::debug!(
            old = ?self.capacity,
            new = ?capacity,
            dropped = self.entries.len(),
            "Schedule cache capacity changed, clearing"
        );
        self.capacity = capacity;
        self.clear();
        true
    }

    /// Looks up an entry and marks it most recently used.
    pub fn get(&mut self, key: &RateKey) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?.clone();
        self.promote(key);
        Some(entry)
    }

    /// Inserts or replaces the entry for `key` as most recently used.
    ///
    /// Returns the evicted key when a bounded cache was full.
    pub fn put(&mut self, key: RateKey, entry: CacheEntry) -> Option<RateKey> {
        if self.entries.insert(key.clone(), entry).is_some() {
            self.promote(&key);
            return None;
        }

        self.recency.push_front(key);

        let limit = self.capacity.limit()?;
        if self.recency.len() <= limit {
            return None;
        }

        let evicted = self.recency.pop_back()?;
        self.entries.remove(&evicted);
        tracing::trace!(key = %evicted, "Evicted least recently used schedule");
        Some(evicted)
    }

    /// Returns the most recently used key.
    pub fn most_recent_key(&self) -> Option<&RateKey> {
        self.recency.front()
    }

    /// Returns the most recently used entry without touching recency.
    pub fn most_recent(&self) -> Option<(&RateKey, &CacheEntry)> {
        let key = self.recency.front()?;
        self.entries.get(key).map(|entry| (key, entry))
    }

    /// Returns true if `key` is cached. Does not affect recency.
    pub fn contains(&self, key: &RateKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drops a single entry.
    pub fn remove(&mut self, key: &RateKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.retain(|k| k != key);
        Some(entry)
    }

    /// Clears all cache entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached keys, most recently used first.
    pub fn keys(&self) -> impl Iterator<Item = &RateKey> {
        self.recency.iter()
    }

    fn promote(&mut self, key: &RateKey) {
        if self.recency.front() == Some(key) {
            return;
        }
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_front(k);
            }
        }
    }
}
