use std::time::Duration;

/// Short-lived store for raw page bodies, keyed by URL.
pub trait PageCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, ttl: Duration);
    fn remove(&self, key: &str);
}
