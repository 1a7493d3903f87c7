

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::orchestrator::QueryResponse;


#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

/// LRU cache of answered queries with a time-to-live.
pub struct QueryCache {
    cache: Mutex<LruCache<String, (QueryResponse, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn make_key(question: &str, job_id: Option<i64>, paper_id: Option<i64>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(question.trim().as_bytes());
        hasher.update(format!("|job={job_id:?}|paper={paper_id:?}").as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<QueryResponse> {
        let mut cache = self.cache.lock();
        let entry = cache
            .get(key)
            .map(|(value, stored_at)| (value.clone(), stored_at.elapsed() < self.ttl));

        match entry {
            Some((value, true)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some((_, false)) => {
                cache.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: QueryResponse) {
        self.cache.lock().put(key.to_string(), (value, Instant::now()));
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        CacheStats {
            hits,
            misses,
            size: self.cache.lock().len(),
            hit_rate,
        }
    }

    /// Drops every entry; called after any index or graph write.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::answer::Confidence;

    fn response(answer: &str) -> QueryResponse {
        QueryResponse::no_information(answer)
    }

    #[test]
    fn test_key_depends_on_scope() {
        let a = QueryCache::make_key("what is pruning", Some(1), None);
        let b = QueryCache::make_key("what is pruning", Some(2), None);
        let c = QueryCache::make_key(" what is pruning ", Some(1), None);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_get_set_and_stats() {
        let cache = QueryCache::new(2, 60);
        assert!(cache.get("k").is_none());
        cache.set("k", response("cached"));

        let hit = cache.get("k").unwrap();
        assert_eq!(hit.answer, "cached");
        assert_eq!(hit.confidence, Confidence::Low);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_expired_entries_miss() {
        let cache = QueryCache::new(2, 0);
        cache.set("k", response("stale"));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_clear() {
        let cache = QueryCache::new(2, 60);
        cache.set("k", response("cached"));
        cache.clear();
        assert!(cache.get("k").is_none());
    }
}
