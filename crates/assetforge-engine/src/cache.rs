//! Bounded memoization cache keyed by node content hash.
//!
//! Strict LRU over an object count: a hit moves the entry to the back of the
//! recency order, and inserting into a full cache evicts the front. Failed
//! computations are never stored, so a later request retries them.

use indexmap::IndexMap;
use tracing::debug;

use assetforge_core::ContentHash;

/// Default number of resident entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache; 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Least-recently-used cache from [`ContentHash`] to `V`.
///
/// Iteration order of `entries` is recency order, oldest first.
#[derive(Debug, Clone)]
pub struct MemoCache<V> {
    entries: IndexMap<ContentHash, V>,
    capacity: usize,
    stats: CacheStats,
}

impl<V: Clone> MemoCache<V> {
    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MemoCache {
            entries: IndexMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Returns the value for `hash`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once, and never on a hit. An error from
    /// `compute` is returned as-is and leaves the cache unchanged.
    pub fn get_or_compute<E>(
        &mut self,
        hash: ContentHash,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.touch(&hash) {
            self.stats.hits += 1;
            debug!(hash = ?hash, "cache hit");
            return Ok(value);
        }

        self.stats.misses += 1;
        debug!(hash = ?hash, "cache miss");
        let value = compute()?;
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(hash, value.clone());
        Ok(value)
    }

    /// Looks up `hash`, marking it most recently used. Not counted in stats.
    pub fn get(&mut self, hash: &ContentHash) -> Option<V> {
        self.touch(hash)
    }

    /// Looks up `hash` without touching recency.
    pub fn peek(&self, hash: &ContentHash) -> Option<&V> {
        self.entries.get(hash)
    }

    /// Drops `hash` without counting an eviction. The next lookup misses.
    pub fn remove(&mut self, hash: &ContentHash) -> Option<V> {
        self.entries.shift_remove(hash)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
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
        self.stats
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn touch(&mut self, hash: &ContentHash) -> Option<V> {
        let index = self.entries.get_index_of(hash)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, value)| value.clone())
    }

    fn evict_oldest(&mut self) {
        if let Some((hash, _)) = self.entries.shift_remove_index(0) {
            self.stats.evictions += 1;
            debug!(hash = ?hash, "cache eviction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetforge_core::hash_bytes;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn h(n: u8) -> ContentHash {
        hash_bytes(&[n])
    }

    fn ok(v: u32) -> impl FnOnce() -> Result<u32, ()> {
        move || Ok(v)
    }

    #[test]
    fn hit_does_not_recompute() {
        let mut cache = MemoCache::new(4);
        let calls = Cell::new(0);
        for _ in 0..3 {
            let v = cache
                .get_or_compute(h(1), || {
                    calls.set(calls.get() + 1);
                    Ok::<_, ()>(10)
                })
                .unwrap();
            assert_eq!(v, 10);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = MemoCache::new(2);
        cache.get_or_compute(h(1), ok(1)).unwrap();
        cache.get_or_compute(h(2), ok(2)).unwrap();
        // Touch 1 so 2 becomes the eviction candidate.
        cache.get_or_compute(h(1), ok(99)).unwrap();
        cache.get_or_compute(h(3), ok(3)).unwrap();

        assert!(cache.contains(&h(1)));
        assert!(!cache.contains(&h(2)));
        assert!(cache.contains(&h(3)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn evicted_entry_is_recomputed() {
        let mut cache = MemoCache::new(1);
        cache.get_or_compute(h(1), ok(1)).unwrap();
        cache.get_or_compute(h(2), ok(2)).unwrap();
        assert_eq!(cache.get_or_compute(h(1), ok(7)).unwrap(), 7);
        assert_eq!(cache.stats().misses, 3);
    }

    #[test]
    fn failure_is_not_stored() {
        let mut cache: MemoCache<u32> = MemoCache::new(2);
        let err = cache.get_or_compute(h(1), || Err("boom")).unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_compute(h(1), || Ok::<_, &str>(5)).unwrap(), 5);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = MemoCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.get_or_compute(h(1), ok(1)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn peek_and_contains_leave_recency_alone() {
        let mut cache = MemoCache::new(2);
        cache.get_or_compute(h(1), ok(1)).unwrap();
        cache.get_or_compute(h(2), ok(2)).unwrap();
        assert_eq!(cache.peek(&h(1)), Some(&1));
        assert!(cache.contains(&h(1)));
        cache.get_or_compute(h(3), ok(3)).unwrap();
        assert!(!cache.contains(&h(1)), "peek must not refresh recency");
    }

    #[test]
    fn removed_entry_misses_and_keeps_recency_of_others() {
        let mut cache = MemoCache::new(2);
        cache.get_or_compute(h(1), ok(1)).unwrap();
        cache.get_or_compute(h(2), ok(2)).unwrap();
        assert_eq!(cache.remove(&h(1)), Some(1));
        assert_eq!(cache.remove(&h(1)), None);
        assert_eq!(cache.get_or_compute(h(1), ok(10)).unwrap(), 10);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.stats().misses, 3);
        // 2 is now the oldest entry.
        cache.get_or_compute(h(3), ok(3)).unwrap();
        assert!(!cache.contains(&h(2)));
    }

    #[test]
    fn clear_keeps_counters() {
        let mut cache = MemoCache::new(2);
        cache.get_or_compute(h(1), ok(1)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity_and_counts_add_up(
            capacity in 1usize..8,
            keys in proptest::collection::vec(0u8..16, 0..64),
        ) {
            let mut cache = MemoCache::new(capacity);
            for key in &keys {
                let value = cache.get_or_compute(h(*key), ok(u32::from(*key))).unwrap();
                prop_assert_eq!(value, u32::from(*key));
                prop_assert!(cache.len() <= capacity);
            }
            let stats = cache.stats();
            prop_assert_eq!(stats.hits + stats.misses, keys.len() as u64);
            prop_assert_eq!(stats.misses - stats.evictions, cache.len() as u64);
        }
    }
}
