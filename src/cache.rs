use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Time-bounded memo of successful gateway results, keyed by exact input.
///
/// Callers only insert successes, so a transient failure is never replayed.
/// Concurrent inserts on the same key are last-writer-wins.
pub struct ResponseCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Stores `value` and drops every entry that has already expired, so
    /// keys that are never read again do not accumulate.
    pub fn insert(&self, key: K, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
            entries.insert(
                key,
                CacheEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache: ResponseCache<String, u32> = ResponseCache::new(Duration::from_secs(10));
        cache.insert("k".to_string(), 7);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get(&"k".to_string()), Some(7));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"k".to_string()), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_writer_wins() {
        let cache: ResponseCache<(Vec<u8>, String), String> = ResponseCache::new(DEFAULT_CACHE_TTL);
        let key = (vec![1, 2, 3], "es-ES".to_string());

        cache.insert(key.clone(), "first".to_string());
        cache.insert(key.clone(), "second".to_string());

        assert_eq!(cache.get(&key), Some("second".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_sweeps_expired_keys() {
        let cache: ResponseCache<u32, u32> = ResponseCache::new(Duration::from_secs(10));
        for i in 0..50 {
            cache.insert(i, i);
            tokio::time::advance(Duration::from_secs(11)).await;
        }

        cache.insert(99, 99);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&99), Some(99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_fresh_entries() {
        let cache: ResponseCache<u8, u8> = ResponseCache::new(Duration::from_secs(5));
        cache.insert(1, 1);
        tokio::time::advance(Duration::from_secs(4)).await;
        cache.insert(2, 2);
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some(2));
    }
}
