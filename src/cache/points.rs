//! In-memory result cache for synthesized point sets.
//!
//! # Keys
//!
//! [`CacheKey`] pairs a normalized topic with the requested count. Topics are
//! trimmed, lowercased and whitespace-collapsed, so `"Solar  Energy "` and
//! `"solar energy"` share an entry.
//!
//! # Eviction
//!
//! Strict least-recently-used by `last_used_at`. Entries are ordered by
//! `(last_used_at, access sequence)`: the sequence is a per-cache monotonic
//! counter bumped on every insert and hit, so entries whose timestamps tie
//! are still evicted in access order (earliest first). Eviction runs on
//! insert, before the new entry is stored, so the cache never holds more
//! than `max_entries`.
//!
//! # Concurrency
//!
//! One `std::sync::Mutex` guards the map; each `get` and `insert` is a
//! single critical section and no lock is held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::telemetry;
use crate::types::{PointCount, Statement};

/// Configuration for the result cache.
///
/// ```rust
/// # use munin::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 100.
    pub max_entries: usize,
    /// Optional time-to-live measured from creation. Default: none.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: None,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Normalize a topic for cache lookups.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Cache key: normalized topic plus requested count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    topic: String,
    count: PointCount,
}

impl CacheKey {
    pub fn new(topic: &str, count: PointCount) -> Self {
        Self {
            topic: normalize_topic(topic),
            count,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn count(&self) -> PointCount {
        self.count
    }
}

/// A cached point set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub points: Vec<Statement>,
    /// How long the original synthesis took.
    pub generation_time: Duration,
    pub created_at: Instant,
    pub last_used_at: Instant,
    last_used_seq: u64,
}

impl CacheEntry {
    pub fn new(points: Vec<Statement>, generation_time: Duration) -> Self {
        let now = Instant::now();
        Self {
            points,
            generation_time,
            created_at: now,
            last_used_at: now,
            last_used_seq: 0,
        }
    }
}

struct Entries {
    map: HashMap<CacheKey, CacheEntry>,
    clock: u64,
}

impl Entries {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded LRU cache of point sets. See module docs.
pub struct PointCache {
    entries: Mutex<Entries>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PointCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                clock: 0,
            }),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up an entry, marking it as most recently used.
    ///
    /// Expired entries are removed and reported as misses.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let now = Instant::now();
        let expired = entries
            .map
            .get(key)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            entries.map.remove(key);
        }

        let seq = entries.tick();
        let found = entries.map.get_mut(key).map(|entry| {
            entry.last_used_at = now;
            entry.last_used_seq = seq;
            entry.clone()
        });
        drop(entries);

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        }
        found
    }

    /// Store an entry, evicting least-recently-used entries if full.
    ///
    /// Points beyond the key's count are dropped.
    pub fn insert(&self, key: CacheKey, mut entry: CacheEntry) {
        if self.config.max_entries == 0 {
            return;
        }
        entry.points.truncate(key.count.get());

        let mut entries = self.lock();
        if !entries.map.contains_key(&key) {
            while entries.map.len() >= self.config.max_entries {
                let Some(oldest) = entries
                    .map
                    .iter()
                    .min_by_key(|(_, e)| (e.last_used_at, e.last_used_seq))
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                entries.map.remove(&oldest);
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
                debug!(topic = oldest.topic(), count = oldest.count.get(), "evicted cache entry");
            }
        }

        entry.last_used_at = Instant::now();
        entry.last_used_seq = entries.tick();
        entries.map.insert(key, entry);
    }

    /// Number of entries currently in the cache.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries. Hit/miss counters are kept.
    pub fn clear(&self) {
        self.lock().map.clear();
    }

    /// Fraction of lookups that hit, or `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        (total > 0).then(|| hits as f64 / total as f64)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| now.duration_since(entry.created_at) >= ttl)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // The map stays consistent even if a holder panicked.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PointCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
