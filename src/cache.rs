// Comparison result cache
// Sits between the query endpoint and the comparison engine so repeated searches for a
// city don't fan out to every supplier again within the TTL.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::ComparisonResult;

// Cache stats
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub store_count: usize,
}

// Cache configuration options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    // 0 disables the background sweep; expiry is still enforced on read
    pub cleanup_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            cleanup_interval_seconds: 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

// Contract for the comparison result store.
//
// Entries are replaced whole on `put`; a `get` on an expired entry is a miss.
pub trait OfferCache: Send + Sync + 'static {
    fn new(config: CacheConfig) -> Self
    where
        Self: Sized;

    fn get(&self, city: &str) -> Option<Arc<ComparisonResult>>;

    fn put(&self, city: &str, result: ComparisonResult);

    fn stats(&self) -> CacheStats;

    // Drop every expired entry, returning how many were removed
    fn purge_expired(&self) -> usize;

    fn clear(&self);
}

// "Delhi" and "delhi" share an entry
pub fn create_cache_key(city: &str) -> String {
    format!("hotels:{}", city.to_lowercase())
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<ComparisonResult>,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_alive(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct TtlCache {
    store: DashMap<String, CacheEntry>,
    ttl: Duration,
    cache_stats: RwLock<CacheStats>,
}

impl TtlCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            ttl,
            cache_stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl OfferCache for TtlCache {
    fn new(config: CacheConfig) -> Self
    where
        Self: Sized,
    {
        Self::with_ttl(config.ttl())
    }

    fn get(&self, city: &str) -> Option<Arc<ComparisonResult>> {
        let key = create_cache_key(city);
        let now = Instant::now();

        let hit = self
            .store
            .get(&key)
            .filter(|entry| entry.is_alive(now))
            .map(|entry| Arc::clone(&entry.value));

        if hit.is_some() {
            self.cache_stats.write().hit_count += 1;
            debug!(key = %key, "Cache hit");
            return hit;
        }

        // Only remove the entry if it is still the stale one; a concurrent put may have
        // refreshed it in between
        if self
            .store
            .remove_if(&key, |_, entry| !entry.is_alive(now))
            .is_some()
        {
            self.cache_stats.write().expired_count += 1;
            debug!(key = %key, "Cache entry expired");
        }

        self.cache_stats.write().miss_count += 1;
        debug!(key = %key, "Cache miss");
        None
    }

    fn put(&self, city: &str, result: ComparisonResult) {
        let key = create_cache_key(city);
        let entry = CacheEntry {
            value: Arc::new(result),
            expires_at: Instant::now() + self.ttl,
        };

        debug!(key = %key, hotels = entry.value.len(), ttl_secs = self.ttl.as_secs(), "Caching comparison result");
        self.store.insert(key, entry);
        self.cache_stats.write().store_count += 1;
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.cache_stats.read().clone();
        stats.items_count = self.store.len();
        stats
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| entry.is_alive(now));
        let removed = before.saturating_sub(self.store.len());

        if removed > 0 {
            self.cache_stats.write().expired_count += removed;
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    fn clear(&self) {
        self.store.clear();
    }
}

// Periodically purge expired entries. Abort the handle at shutdown.
pub fn spawn_sweeper<C: OfferCache + ?Sized>(cache: Arc<C>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.purge_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolvedOffer;
    use std::thread;

    fn result(name: &str, price: f64) -> ComparisonResult {
        vec![ResolvedOffer {
            canonical_name: name.to_string(),
            price,
            won_by_supplier: "Supplier A".to_string(),
            commission_pct: 10.0,
        }]
    }

    #[test]
    fn test_city_key_is_case_insensitive() {
        let cache = TtlCache::new(CacheConfig::default());
        cache.put("Delhi", result("Holtin", 5340.0));

        let hit = cache.get("delhi").expect("cached under lower-cased key");
        assert_eq!(hit[0].canonical_name, "Holtin");
        assert!(cache.get("DELHI").is_some());
        assert!(cache.get("mumbai").is_none());
    }

    #[test]
    fn test_expiration_and_ttl() {
        let cache = TtlCache::with_ttl(Duration::from_millis(100));
        cache.put("delhi", result("Holtin", 5340.0));

        assert!(cache.get("delhi").is_some());

        thread::sleep(Duration::from_millis(150));

        assert!(cache.get("delhi").is_none());
        let stats = cache.stats();
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.items_count, 0);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_put_replaces_whole_entry_and_refreshes_ttl() {
        let cache = TtlCache::with_ttl(Duration::from_millis(200));
        cache.put("delhi", result("Holtin", 6000.0));

        thread::sleep(Duration::from_millis(120));
        cache.put("delhi", result("Radison", 5900.0));
        thread::sleep(Duration::from_millis(120));

        let hit = cache.get("delhi").expect("refreshed entry still alive");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].canonical_name, "Radison");
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let cache = TtlCache::new(CacheConfig::default());
        cache.put("delhi", result("Holtin", 6000.0));

        let before = cache.get("delhi").unwrap();
        cache.put("delhi", result("Holtin", 5340.0));

        assert_eq!(before[0].price, 6000.0);
        assert_eq!(cache.get("delhi").unwrap()[0].price, 5340.0);
    }

    #[test]
    fn test_purge_expired() {
        let cache = TtlCache::with_ttl(Duration::from_millis(50));
        cache.put("delhi", result("Holtin", 5340.0));
        cache.put("mumbai", result("Marriott", 7500.0));

        assert_eq!(cache.purge_expired(), 0);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.stats().items_count, 0);
        assert_eq!(cache.stats().expired_count, 2);
    }

    #[test]
    fn test_concurrent_puts_on_same_key() {
        let cache = Arc::new(TtlCache::new(CacheConfig::default()));
        let mut handles = vec![];

        for i in 0..16 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    let price = (i * 1000 + j) as f64 + 1.0;
                    cache.put("delhi", result(&format!("Hotel {}", i), price));
                    let seen = cache.get("Delhi").expect("entry present");
                    // Every read sees one complete entry, never a mix
                    assert_eq!(seen.len(), 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.items_count, 1);
        assert_eq!(stats.store_count, 16 * 200);
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::new(CacheConfig::default());
        cache.put("delhi", result("Holtin", 5340.0));
        cache.clear();

        assert!(cache.get("delhi").is_none());
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let cache = Arc::new(TtlCache::with_ttl(Duration::from_millis(20)));
        cache.put("delhi", result("Holtin", 5340.0));

        let sweeper = spawn_sweeper(cache.clone(), Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(120)).await;
        sweeper.abort();

        assert_eq!(cache.stats().items_count, 0);
        assert_eq!(cache.stats().expired_count, 1);
    }
}
