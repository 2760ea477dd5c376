//! In-memory key-value store with LRU eviction and TTL
//!
//! Backs the lookup and aggregation stores when no database is configured,
//! and in tests. Entries expire like the upstream cache entries they mirror.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AggregationStore, LookupStore, Result};

// ============================================================================
// LRU Cache
// ============================================================================

/// Bounded map with least-recently-used eviction and optional TTL
///
/// Hits only take the read lock; recency is tracked per entry atomically.
pub struct LruCache<K, V> {
    max_entries: usize,
    /// `None` keeps entries until evicted
    ttl: Option<Duration>,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    /// Reference point for `last_accessed`
    epoch: Instant,
    stats: CacheStats,
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    /// Nanoseconds since the cache epoch
    last_accessed: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.created_at) > ttl)
    }
}

/// Hit/miss counters
#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "hits": self.hits(),
            "misses": self.misses(),
            "hit_rate": self.hit_rate(),
            "evictions": self.evictions(),
            "expirations": self.expirations(),
        })
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ttl,
            entries: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
            stats: CacheStats::default(),
        }
    }

    fn ticks(&self, now: Instant) -> u64 {
        u64::try_from(now.duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(self.ttl, now) => {
                    entry.last_accessed.store(self.ticks(now), Ordering::Relaxed);
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, a writer may have replaced it
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.ttl, now))
        {
            entries.remove(key);
            self.stats.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            self.evict_oldest(&mut entries);
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: AtomicU64::new(self.ticks(now)),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn evict_oldest(&self, entries: &mut HashMap<K, CacheEntry<V>>) {
        if let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, e)| e.last_accessed.load(Ordering::Relaxed))
            .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest_key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every expired entry
    pub async fn cleanup_expired(&self) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();

        entries.retain(|_, e| !e.is_expired(self.ttl, now));

        let removed = (before - entries.len()) as u64;
        self.stats.expirations.fetch_add(removed, Ordering::Relaxed);
    }
}

// ============================================================================
// Key-value store
// ============================================================================

/// Process-local key-value store implementing both pipeline stores
pub struct InMemoryKeyValueStore {
    entries: LruCache<String, String>,
}

impl InMemoryKeyValueStore {
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: LruCache::new(max_entries, ttl),
        }
    }

    /// Store without expiry or practical size bound (tests, seeding).
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, None)
    }

    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into()).await;
    }

    pub async fn fetch(&self, key: &str) -> Option<String> {
        self.entries.get(&key.to_string()).await
    }

    pub async fn len(&self) -> usize {
        self.entries.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.is_empty().await
    }

    pub async fn cleanup_expired(&self) {
        self.entries.cleanup_expired().await;
    }

    pub fn stats(&self) -> &CacheStats {
        self.entries.stats()
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new(100_000, Some(Duration::from_secs(3600)))
    }
}

#[async_trait]
impl LookupStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.fetch(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value).await;
        Ok(())
    }
}

#[async_trait]
impl AggregationStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.fetch(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value).await;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
