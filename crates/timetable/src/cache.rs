//! Bounded memoization for filtered views
//!
//! Filtered views are keyed by exclusion sets, and the number of distinct
//! sets grows combinatorially, so the cache holds a fixed number of entries
//! and evicts the least recently used one when full.

use std::collections::HashMap;
use std::hash::Hash;

/// Default number of distinct exclusion sets remembered per aggregate
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cache entry with its recency stamp
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    last_accessed: u64,
}

/// Fixed-capacity key/value cache with LRU eviction
#[derive(Debug)]
pub struct ProjectionCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    capacity: usize,
    /// Monotonic access counter used as the recency clock
    tick: u64,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> ProjectionCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    pub fn get_or_insert_with<F>(&mut self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_accessed = tick;
            self.hits += 1;
            return entry.value.clone();
        }

        self.misses += 1;
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        let value = compute();
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                last_accessed: tick,
            },
        );
        value
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry. Hit/miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for ProjectionCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Entries currently held
    pub entries: usize,

    /// Lookups answered from the cache
    pub hits: u64,

    /// Lookups that had to compute the value
    pub misses: u64,
}
