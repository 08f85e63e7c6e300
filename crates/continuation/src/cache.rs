use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, Weak},
    time::Duration,
};

use {
    palaver_common::SenderKey,
    tokio::{
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, trace},
};

#[cfg(feature = "metrics")]
use palaver_metrics::{conversation as conv_metrics, counter, gauge};

/// Default time an idle conversation stays resumable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60);

/// Default cadence of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Timing knobs for a [`ContinuationCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of an entry, measured from the `set` that stored it.
    pub ttl: Duration,
    /// How often the sweeper scans for expired entries. Zero disables it.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Table<T> = RwLock<HashMap<SenderKey, Entry<T>>>;

/// Concurrency-safe map from sender to a pending value with an expiry.
///
/// At most one entry exists per sender. Expired entries are never returned,
/// whether or not the sweeper has visited them yet.
pub struct ContinuationCache<T> {
    table: Arc<Table<T>>,
    config: CacheConfig,
}

impl<T> ContinuationCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &SenderKey) -> bool {
        let now = Instant::now();
        self.read()
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Store `value` for `key`, replacing any previous entry.
    ///
    /// The entry expires `ttl` from now. A replaced value is dropped without
    /// being handed to anyone.
    pub fn set(&self, key: SenderKey, value: T) {
        let expires_at = Instant::now() + self.config.ttl;
        let mut table = self.write();
        if table.insert(key.clone(), Entry { value, expires_at }).is_some() {
            debug!(sender = %key, "replaced pending continuation");
        }
        #[cfg(feature = "metrics")]
        gauge!(conv_metrics::PENDING).set(table.len() as f64);
    }

    /// Remove the entry for `key`. No-op when absent.
    pub fn delete(&self, key: &SenderKey) {
        let mut table = self.write();
        table.remove(key);
        #[cfg(feature = "metrics")]
        gauge!(conv_metrics::PENDING).set(table.len() as f64);
    }

    /// Remove and return the live value for `key` in one step.
    ///
    /// Lookup and removal happen under a single write lock, so concurrent
    /// callers racing on the same key see the value at most once. An expired
    /// entry is dropped and reported as absent.
    pub fn take(&self, key: &SenderKey) -> Option<T> {
        let now = Instant::now();
        let mut table = self.write();
        let entry = table.remove(key);
        #[cfg(feature = "metrics")]
        gauge!(conv_metrics::PENDING).set(table.len() as f64);
        drop(table);

        match entry {
            Some(entry) if entry.is_live(now) => Some(entry.value),
            Some(_) => {
                trace!(sender = %key, "pending continuation already expired");
                None
            },
            None => None,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        evict_expired_in(&self.table, Instant::now())
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SenderKey, Entry<T>>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SenderKey, Entry<T>>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> ContinuationCache<T> {
    /// Return a copy of the live value for `key` without removing it.
    pub fn get(&self, key: &SenderKey) -> Option<T> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }
}

impl<T: Send + Sync + 'static> ContinuationCache<T> {
    /// Start the background sweep.
    ///
    /// The task runs every `sweep_interval` until `cancel` fires or the cache
    /// is dropped. Returns `None` when the interval is zero.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let period = self.config.sweep_interval;
        if period.is_zero() {
            debug!("continuation sweeper disabled");
            return None;
        }

        let table = Arc::downgrade(&self.table);
        Some(tokio::spawn(sweep_loop(table, period, cancel)))
    }
}

async fn sweep_loop<T>(table: Weak<Table<T>>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(interval_secs = period.as_secs_f64(), "continuation sweeper started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("continuation sweeper stopped");
                break;
            },
            _ = ticker.tick() => {
                let Some(table) = table.upgrade() else {
                    debug!("continuation cache dropped, sweeper exiting");
                    break;
                };
                let evicted = evict_expired_in(&table, Instant::now());
                if evicted > 0 {
                    debug!(evicted, "swept expired continuations");
                }
            },
        }
    }
}

fn evict_expired_in<T>(table: &Table<T>, now: Instant) -> usize {
    let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
    let before = table.len();
    table.retain(|_, entry| entry.is_live(now));
    let evicted = before - table.len();

    #[cfg(feature = "metrics")]
    {
        counter!(conv_metrics::EXPIRED_TOTAL).increment(evicted as u64);
        gauge!(conv_metrics::PENDING).set(table.len() as f64);
    }

    evicted
}
