use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::pubmed::AbstractRecord;

/// Thread-safe LRU cache for fetched abstracts
///
/// Caches abstract records by bare PMID so repeated enrichment passes and
/// rows sharing publications avoid redundant API calls. Uses LRU eviction
/// to maintain bounded memory usage.
pub struct AbstractCache {
    cache: Mutex<LruCache<String, AbstractRecord>>,
}

impl AbstractCache {
    /// Create a new abstract cache with the specified capacity
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0 (LRU cache requires non-zero capacity)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1))
            .expect("Cache capacity must be at least 1");

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get a cached record by bare PMID
    pub fn get(&self, pmid: &str) -> Option<AbstractRecord> {
        self.cache
            .lock()
            .unwrap()
            .get(pmid)
            .cloned()
    }

    /// Store a record in the cache
    pub fn put(&self, pmid: String, record: AbstractRecord) {
        self.cache
            .lock()
            .unwrap()
            .put(pmid, record);
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pmid: &str) -> AbstractRecord {
        AbstractRecord {
            id: format!("PMID:{}", pmid),
            title: Some("title".to_string()),
            journal: None,
            publication_date: None,
            abstract_text: None,
        }
    }

    #[test]
    fn test_cache_put_get() {
        let cache = AbstractCache::new(10);
        cache.put("1".to_string(), record("1"));
        let hit = cache.get("1").unwrap();
        assert_eq!(hit.id, "PMID:1");
        assert!(cache.get("2").is_none());
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = AbstractCache::new(2);
        cache.put("1".to_string(), record("1"));
        cache.put("2".to_string(), record("2"));
        cache.put("3".to_string(), record("3"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("1").is_none());
        assert!(cache.get("3").is_some());
    }

    #[test]
    fn test_cache_clear() {
        let cache = AbstractCache::new(10);
        cache.put("1".to_string(), record("1"));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_zero_capacity_clamped() {
        let cache = AbstractCache::new(0);
        cache.put("1".to_string(), record("1"));
        assert_eq!(cache.len(), 1);
    }
}
