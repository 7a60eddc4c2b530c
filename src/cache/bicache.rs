//! TTL Bidirectional Cache
//!
//! Public handle tying a [`BiStore`] to its background sweep task.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{BiStore, EvictionHook, StatsSnapshot};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{spawn_sweep_task, SweepTask};

// == TTL Bidirectional Cache ==
/// Thread-safe key/value cache with reverse lookup by value and a fixed TTL.
///
/// Expired entries are invisible to [`get`](Self::get) immediately and are
/// physically removed by a background sweep every `sweep_interval`, which
/// fires the eviction hook. Explicit removals fire the hook as well.
///
/// Clones share the same store and sweep task. The task stops on
/// [`shutdown`](Self::shutdown) or when the last clone is dropped.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use ttl_bicache::TtlBiCache;
///
/// # #[tokio::main]
/// # async fn main() -> ttl_bicache::Result<()> {
/// let cache = TtlBiCache::<String, String>::new(
///     Duration::from_secs(30),
///     Duration::from_secs(1),
///     Some(Arc::new(|user: String| println!("session of {} ended", user))),
/// )?;
///
/// cache.put("alice".to_string(), "token-1".to_string());
/// assert_eq!(cache.get(&"alice".to_string()), Some("token-1".to_string()));
/// assert_eq!(cache.remove_by_value(&"token-1".to_string()), Some("token-1".to_string()));
///
/// cache.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct TtlBiCache<K, V> {
    store: Arc<BiStore<K, V>>,
    sweeper: Arc<SweepTask>,
    sweep_interval: Duration,
}

impl<K, V> Clone for TtlBiCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sweeper: self.sweeper.clone(),
            sweep_interval: self.sweep_interval,
        }
    }
}

impl<K, V> TtlBiCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Eq + Hash + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its sweep task on the current tokio runtime.
    ///
    /// # Errors
    /// - `CacheError::InvalidConfig` if either duration is zero or above
    ///   [`MAX_DURATION`](crate::config::MAX_DURATION)
    /// - `CacheError::NoRuntime` if called outside a tokio runtime
    pub fn new(
        ttl: Duration,
        sweep_interval: Duration,
        on_evict: Option<EvictionHook<K>>,
    ) -> Result<Self> {
        Self::from_config(&CacheConfig::new(ttl, sweep_interval), on_evict)
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig, on_evict: Option<EvictionHook<K>>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(BiStore::new(config.ttl, on_evict));
        let sweeper = spawn_sweep_task(Arc::downgrade(&store), config.sweep_interval)?;

        info!(
            "Cache created: ttl={:?}, sweep_interval={:?}",
            config.ttl, config.sweep_interval
        );

        Ok(Self {
            store,
            sweeper: Arc::new(sweeper),
            sweep_interval: config.sweep_interval,
        })
    }

    // == Operations ==
    /// Inserts `key -> value` expiring one TTL from now. Overwrites do not
    /// fire the eviction hook.
    pub fn put(&self, key: K, value: V) {
        self.store.put(key, value)
    }

    /// Returns the value for `key` if present and unexpired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.store.get(key)
    }

    /// Removes `key` whether or not it has expired; fires the hook on success.
    pub fn remove_by_key(&self, key: &K) -> Option<V> {
        self.store.remove_by_key(key)
    }

    /// Removes the entry `value` belongs to; fires the hook on success.
    pub fn remove_by_value(&self, value: &V) -> Option<V> {
        self.store.remove_by_value(value)
    }

    // == Lifecycle ==
    /// Stops the background sweep. Entries stay readable until they expire
    /// but are no longer evicted or reported to the hook.
    pub fn shutdown(&self) {
        info!("Shutting down expiry sweep");
        self.sweeper.shutdown();
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    // == Accessors ==
    /// Entries physically held, including expired ones awaiting the sweep.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.store.ttl()
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.store.stats()
    }
}
