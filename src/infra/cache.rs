//! Bounded in-memory store for rendered post bodies.

use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;

use crate::application::repos::{RenderCacheRepo, RepoError};

use super::lock::{rw_read, rw_write};

pub const METRIC_RENDER_CACHE_HIT: &str = "mdtoggle_render_cache_hit_total";
pub const METRIC_RENDER_CACHE_MISS: &str = "mdtoggle_render_cache_miss_total";
pub const METRIC_RENDER_CACHE_EVICT: &str = "mdtoggle_render_cache_evict_total";

const SOURCE: &str = "infra::cache";

/// LRU-bounded render cache. Entries never expire on their own.
pub struct RenderCache {
    entries: RwLock<LruCache<String, String>>,
}

impl RenderCache {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(limit)),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RenderCacheRepo for RenderCache {
    fn get(&self, key: &str) -> Result<Option<String>, RepoError> {
        let value = rw_write(&self.entries, SOURCE, "get").get(key).cloned();
        let metric = if value.is_some() {
            METRIC_RENDER_CACHE_HIT
        } else {
            METRIC_RENDER_CACHE_MISS
        };
        counter!(metric).increment(1);
        Ok(value)
    }

    fn set(&self, key: &str, value: String) -> Result<(), RepoError> {
        let evicted = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), value);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!(METRIC_RENDER_CACHE_EVICT).increment(1);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), RepoError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(limit: usize) -> RenderCache {
        RenderCache::new(NonZeroUsize::new(limit).expect("non-zero limit"))
    }

    #[test]
    fn set_get_delete() {
        let cache = cache(4);
        cache.set("a", "<p>a</p>".to_string()).expect("set");
        assert_eq!(cache.get("a").expect("get").as_deref(), Some("<p>a</p>"));

        cache.delete("a").expect("delete");
        assert_eq!(cache.get("a").expect("get"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        cache.set("a", "1".to_string()).expect("set");
        cache.set("b", "2".to_string()).expect("set");
        cache.get("a").expect("get");
        cache.set("c", "3".to_string()).expect("set");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").expect("get").is_none());
        assert!(cache.get("a").expect("get").is_some());
    }

    #[test]
    fn deleting_missing_key_is_fine() {
        cache(1).delete("absent").expect("delete");
    }
}
