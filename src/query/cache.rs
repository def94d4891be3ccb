use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use crate::query::types::QueryDescription;
use crate::search::results::SearchResults;

/// Bounded cache of finished query results
pub struct QueryCache {
    cache: Mutex<LruCache<QueryDescription, Arc<SearchResults>>>,
    size_limit: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl QueryCache {
    pub fn new(size_limit: usize) -> Self {
        let cap = NonZeroUsize::new(size_limit).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            cache: Mutex::new(LruCache::new(cap)),
            size_limit: cap.get(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    /// Lookup that counts towards the hit rate
    pub fn get(&self, key: &QueryDescription) -> Option<Arc<SearchResults>> {
        let mut cache = self.cache.lock();
        if let Some(results) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(results))
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Lookup without touching recency or statistics
    pub fn peek(&self, key: &QueryDescription) -> Option<Arc<SearchResults>> {
        self.cache.lock().peek(key).cloned()
    }

    pub fn put(&self, key: QueryDescription, results: Arc<SearchResults>) {
        self.cache.lock().put(key, results);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.size_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Arc<SearchResults> {
        Arc::new(SearchResults::new(Vec::new(), 0))
    }

    #[test]
    fn counts_hits_and_misses() {
        let cache = QueryCache::new(4);
        let key = QueryDescription::all().with_pattern("war", "i");
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), results());
        assert!(cache.get(&key).is_some());
        assert!(cache.peek(&key).is_some());

        let stats = cache.stats();
        assert_eq!((stats.hit_count, stats.miss_count, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn stays_within_capacity() {
        let cache = QueryCache::new(2);
        for pattern in ["a", "b", "c"] {
            cache.put(QueryDescription::all().with_pattern(pattern, ""), results());
        }
        assert_eq!(cache.stats().size, 2);
        assert!(cache.peek(&QueryDescription::all().with_pattern("a", "")).is_none());
        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }
}
