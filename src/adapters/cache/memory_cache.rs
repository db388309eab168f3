use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::{debug, error, warn};

use crate::ports::page_cache::PageCache;

const FALLBACK_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(99);

struct CachedPage {
    body: String,
    expires_at: Instant,
}

/// In-process LRU of fetched page bodies with per-entry expiry.
pub struct MemoryPageCache {
    pages: RwLock<LruCache<String, CachedPage>>,
}

impl MemoryPageCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or_else(|| {
            warn!(
                fallback = FALLBACK_CAPACITY.get(),
                "page cache max_entries was 0, using fallback"
            );
            FALLBACK_CAPACITY
        });
        Self {
            pages: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.pages.read().map_or(0, |pages| {
            pages.iter().filter(|(_, page)| page.expires_at > now).count()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageCache for MemoryPageCache {
    fn get(&self, key: &str) -> Option<String> {
        let Ok(mut pages) = self.pages.write() else {
            error!(key, "page cache lock poisoned on get, treating as miss");
            return None;
        };
        let page = pages.get(key)?;
        if Instant::now() >= page.expires_at {
            debug!(key, "cached page expired");
            pages.pop(key);
            return None;
        }
        Some(page.body.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        let Ok(mut pages) = self.pages.write() else {
            error!(key, "page cache lock poisoned on set, skipping write");
            return;
        };
        pages.put(
            key.to_string(),
            CachedPage {
                body: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn remove(&self, key: &str) {
        if let Ok(mut pages) = self.pages.write() {
            pages.pop(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/project/1";

    #[test]
    fn miss_on_empty_cache() {
        let cache = MemoryPageCache::new(10);
        assert!(cache.get(PAGE).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn stores_and_returns_body() {
        let cache = MemoryPageCache::new(10);
        cache.set(PAGE, "<html></html>", Duration::from_secs(60));
        assert_eq!(cache.get(PAGE).as_deref(), Some("<html></html>"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = MemoryPageCache::new(10);
        cache.set(PAGE, "<html></html>", Duration::ZERO);
        assert!(cache.get(PAGE).is_none());
    }

    #[test]
    fn least_recently_used_page_is_evicted() {
        let cache = MemoryPageCache::new(2);
        cache.set("a", "1", Duration::from_secs(60));
        cache.set("b", "2", Duration::from_secs(60));
        assert!(cache.get("a").is_some());
        cache.set("c", "3", Duration::from_secs(60));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn remove_forces_refetch() {
        let cache = MemoryPageCache::new(10);
        cache.set(PAGE, "old", Duration::from_secs(60));
        cache.remove(PAGE);
        assert!(cache.get(PAGE).is_none());
    }

    #[test]
    fn zero_capacity_uses_fallback() {
        let cache = MemoryPageCache::new(0);
        cache.set(PAGE, "body", Duration::from_secs(60));
        assert_eq!(cache.get(PAGE).as_deref(), Some("body"));
    }

    #[test]
    fn shared_between_threads() {
        use std::sync::Arc;
        let cache = Arc::new(MemoryPageCache::new(100));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let key = format!("{PAGE}{i}");
                    cache.set(&key, "body", Duration::from_secs(60));
                    cache.get(&key)
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
    }
}
