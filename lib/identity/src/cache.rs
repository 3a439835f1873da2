//! Loading cache on top of [`moka::future::Cache`].
//!
//! Concurrent misses for one key share a single load through
//! `try_get_with`, and moka bounds the number of resident entries.
//!
//! Eviction must also win against loads that are already running: such a
//! load may have read the record before the change that caused the
//! eviction. While any lookup is in progress, every eviction is written to
//! an eviction log as a key or value predicate stamped with an epoch. Each
//! entry carries the epoch its load started at, and an entry older than a
//! matching log record is dropped and loaded again. Once the cache is idle
//! the log is settled: stale entries still resident are invalidated and
//! the records are forgotten.

use crate::config::CacheConfig;
use moka::future::Cache;
use moka::notification::RemovalCause;
use revu_core::{Result, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Point-in-time counters of a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Cache name, for logs and reports.
    pub name: &'static str,
    /// Resident entries, as last counted by moka.
    pub entries: u64,
    /// Lookups answered from a resident entry.
    pub hits: u64,
    /// Lookups that found no usable entry.
    pub misses: u64,
    /// Loads issued to the backing store.
    pub loads: u64,
    /// Entries removed by eviction or capacity pressure.
    pub evictions: u64,
}

type Predicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

#[derive(Clone)]
struct Loaded<V> {
    epoch: u64,
    value: V,
}

struct EvictionLog<K, V> {
    epoch: u64,
    lookups: usize,
    keys: HashMap<K, u64>,
    predicates: Vec<(u64, Predicate<V>)>,
}

impl<K: Eq + Hash + Clone, V> EvictionLog<K, V> {
    fn is_stale(&self, key: &K, entry: &Loaded<V>) -> bool {
        self.keys.get(key).is_some_and(|at| *at > entry.epoch)
            || self
                .predicates
                .iter()
                .any(|(at, matches)| *at > entry.epoch && matches(&entry.value))
    }

    fn record_key(&mut self, key: &K) {
        self.epoch += 1;
        if self.lookups > 0 {
            self.keys.insert(key.clone(), self.epoch);
        }
    }

    fn record_predicate(&mut self, predicate: Predicate<V>) {
        self.epoch += 1;
        if self.lookups > 0 {
            self.predicates.push((self.epoch, predicate));
        }
    }

    fn is_settled(&self) -> bool {
        self.keys.is_empty() && self.predicates.is_empty()
    }
}

/// Cache from `K` to `V` that loads missing values on demand.
pub struct LoadingCache<K, V> {
    name: &'static str,
    max_entries: u64,
    entries: Cache<K, Loaded<V>>,
    log: Mutex<EvictionLog<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        let max_entries = config.max_entries.max(1) as u64;
        let evictions = Arc::new(AtomicU64::new(0));
        let dropped = Arc::clone(&evictions);
        let entries = Cache::builder()
            .name(name)
            .max_capacity(max_entries)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Size {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self {
            name,
            max_entries,
            entries,
            log: Mutex::new(EvictionLog {
                epoch: 0,
                lookups: 0,
                keys: HashMap::new(),
                predicates: Vec::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            evictions,
        }
    }

    /// Returns the cached value for `key`, loading it with `load` on a miss.
    ///
    /// A failed load caches nothing, so the next lookup retries. A load
    /// that raced an eviction of `key` is discarded and `load` runs again.
    ///
    /// # Errors
    ///
    /// Returns the error of the load this lookup waited for.
    pub async fn get_or_load<F, Fut>(&self, key: &K, load: F) -> Result<V, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V, StoreError>>,
    {
        let lookup = self.begin();
        let result = self.lookup(key, &load).await;
        drop(lookup);
        self.settle().await;
        result
    }

    /// Returns the cached value for `key` without loading it.
    pub async fn get_if_present(&self, key: &K) -> Option<V> {
        let lookup = self.begin();
        let entry = self.entries.get(key).await;
        let value = entry
            .filter(|entry| !self.lock().is_stale(key, entry))
            .map(|entry| entry.value);
        drop(lookup);
        self.settle().await;
        value
    }

    /// Removes `key`. Returns true if an entry was resident.
    ///
    /// A load of `key` still running when this returns is not cached.
    pub async fn evict(&self, key: &K) -> bool {
        self.lock().record_key(key);
        let removed = self.entries.remove(key).await.is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(cache = self.name, ?key, "evicted");
        }
        removed
    }

    /// Removes every entry whose value matches `predicate`, including
    /// values of loads still running.
    ///
    /// Returns the number of resident entries removed.
    pub async fn evict_matching(
        &self,
        predicate: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> usize {
        let predicate: Predicate<V> = Arc::new(predicate);
        self.lock().record_predicate(Arc::clone(&predicate));

        let matching: Vec<Arc<K>> = self
            .entries
            .iter()
            .filter(|(_, entry)| predicate(&entry.value))
            .map(|(key, _)| key)
            .collect();
        let mut removed = 0;
        for key in matching {
            if self.entries.remove(key.as_ref()).await.is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(cache = self.name, removed, "evicted matching entries");
        }
        removed
    }

    /// Removes every entry.
    pub fn evict_all(&self) {
        self.lock().record_predicate(Arc::new(|_| true));
        let removed = self.entries.entry_count();
        self.entries.invalidate_all();
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        debug!(cache = self.name, removed, "evicted all entries");
    }

    /// Returns the number of resident entries.
    ///
    /// The count trails inserts and removals until moka's pending
    /// maintenance has run.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Returns true if no entry is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    async fn lookup<F, Fut>(&self, key: &K, load: &F) -> Result<V, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V, StoreError>>,
    {
        if let Some(entry) = self.entries.get(key).await {
            if !self.lock().is_stale(key, &entry) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.value);
            }
            self.entries.invalidate(key).await;
        }

        loop {
            self.misses.fetch_add(1, Ordering::Relaxed);
            let entry = match self
                .entries
                .try_get_with(key.clone(), self.load(key, load))
                .await
            {
                Ok(entry) => entry,
                Err(err) => return Err(err.current_context().clone().into()),
            };
            if !self.lock().is_stale(key, &entry) {
                return Ok(entry.value);
            }
            debug!(cache = self.name, ?key, "discarding load that raced an eviction");
            self.entries.invalidate(key).await;
        }
    }

    async fn load<F, Fut>(&self, key: &K, load: &F) -> Result<Loaded<V>, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V, StoreError>>,
    {
        let epoch = self.lock().epoch;
        self.loads.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, ?key, "loading");
        let value = load().await?;
        Ok(Loaded { epoch, value })
    }

    fn begin(&self) -> Lookup<'_, K, V> {
        self.lock().lookups += 1;
        Lookup { log: &self.log }
    }

    /// Forgets the eviction log once no lookup is in progress.
    ///
    /// Entries loaded before a logged eviction are invalidated first, so
    /// forgetting the record cannot resurrect them.
    async fn settle(&self) {
        let (epoch, keys, predicates) = {
            let log = self.lock();
            if log.lookups > 0 || log.is_settled() {
                return;
            }
            let keys: Vec<(K, u64)> = log.keys.iter().map(|(k, at)| (k.clone(), *at)).collect();
            (log.epoch, keys, log.predicates.clone())
        };

        for (key, at) in keys {
            if let Some(entry) = self.entries.get(&key).await
                && entry.epoch < at
            {
                self.entries.invalidate(&key).await;
            }
        }
        let stale: Vec<Arc<K>> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                predicates
                    .iter()
                    .any(|(at, matches)| *at > entry.epoch && matches(&entry.value))
            })
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            self.entries.invalidate(key.as_ref()).await;
        }

        let mut log = self.lock();
        if log.lookups == 0 {
            log.keys.retain(|_, at| *at > epoch);
            log.predicates.retain(|(at, _)| *at > epoch);
        }
    }

    fn lock(&self) -> MutexGuard<'_, EvictionLog<K, V>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a lookup in progress for as long as it is alive.
struct Lookup<'a, K, V> {
    log: &'a Mutex<EvictionLog<K, V>>,
}

impl<K, V> Drop for Lookup<'_, K, V> {
    fn drop(&mut self) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.lookups -= 1;
    }
}

impl<K, V> fmt::Debug for LoadingCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingCache")
            .field("name", &self.name)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}
