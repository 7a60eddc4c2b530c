//! Cache Store Module
//!
//! Forward (key -> entry) and reverse (value -> key) concurrent maps, kept
//! in step by every mutation, plus the expiry sweep pass.
//!
//! Lock order is always forward shard, then reverse shard. Every reverse
//! insert or removal for a key happens while that key's forward shard is
//! held, so a reverse entry `v -> k` is only observable while the forward
//! map holds `k -> v`.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tracing::{trace, warn};

use crate::cache::{CacheStats, Entry, StatsSnapshot};

/// Callback invoked with the key of every entry removed from the cache.
///
/// The hook runs outside all map locks and may call back into the cache.
/// A hook that owns a `TtlBiCache` clone keeps the cache alive through its
/// own store, so dropping the other handles will not stop the sweep; such
/// callers must call `TtlBiCache::shutdown` themselves, or capture only a
/// `Weak` to something that owns the cache.
pub type EvictionHook<K> = Arc<dyn Fn(K) + Send + Sync>;

/// Why an entry left the cache. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvictionCause {
    Expired,
    Removed,
}

// == Bidirectional Store ==
/// The two coupled maps and everything that mutates them.
pub struct BiStore<K, V> {
    forward: DashMap<K, Entry<V>>,
    reverse: DashMap<V, K>,
    ttl: Duration,
    on_evict: Option<EvictionHook<K>>,
    stats: CacheStats,
}

impl<K, V> BiStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    // == Constructor ==
    pub fn new(ttl: Duration, on_evict: Option<EvictionHook<K>>) -> Self {
        Self {
            forward: DashMap::new(),
            reverse: DashMap::new(),
            ttl,
            on_evict,
            stats: CacheStats::new(),
        }
    }

    // == Put ==
    /// Inserts `key -> value` with a fresh expiry and points `value` back at `key`.
    ///
    /// Overwriting drops the stale reverse entry of the previous value. If
    /// `value` was reachable from another key, it is repointed here and the
    /// other key stays readable by key only. No hook fires.
    pub fn put(&self, key: K, value: V) {
        let entry = Entry::new(value.clone(), self.ttl);

        match self.forward.entry(key) {
            MapEntry::Occupied(mut occupied) => {
                let previous = occupied.insert(entry);
                if previous.value != value {
                    self.unlink_reverse(occupied.key(), &previous.value);
                }
                self.link_reverse(value, occupied.key().clone());
            }
            MapEntry::Vacant(vacant) => {
                let inserted = vacant.insert(entry);
                self.link_reverse(value, inserted.key().clone());
            }
        }

        self.stats.record_insert();
    }

    // == Get ==
    /// Returns the value if present and unexpired. Never removes anything.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let found = self
            .forward
            .get(key)
            .filter(|entry| entry.is_live_at(now))
            .map(|entry| entry.value.clone());

        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    // == Remove By Key ==
    /// Removes `key` regardless of expiry and fires the hook if it was present.
    pub fn remove_by_key(&self, key: &K) -> Option<V> {
        let (key, entry) = match self.forward.entry(key.clone()) {
            MapEntry::Occupied(occupied) => {
                self.unlink_reverse(occupied.key(), &occupied.get().value);
                occupied.remove_entry()
            }
            MapEntry::Vacant(_) => return None,
        };

        trace!("Removed entry by key");
        self.stats.record_removal();
        self.notify(key, EvictionCause::Removed);
        Some(entry.value)
    }

    // == Remove By Value ==
    /// Removes the entry currently reachable from `value` and fires the hook.
    pub fn remove_by_value(&self, value: &V) -> Option<V> {
        loop {
            let key = self.reverse.get(value).map(|owner| owner.value().clone())?;

            let removed = match self.forward.entry(key.clone()) {
                MapEntry::Occupied(occupied) if occupied.get().value == *value => {
                    // Still ours only if nobody repointed the value meanwhile
                    match self.reverse.remove_if(value, |_, owner| *owner == key) {
                        Some(_) => Some(occupied.remove_entry()),
                        None => None,
                    }
                }
                _ => None,
            };

            if let Some((key, entry)) = removed {
                trace!("Removed entry by value");
                self.stats.record_removal();
                self.notify(key, EvictionCause::Removed);
                return Some(entry.value);
            }

            // The reverse entry moved or vanished between the read and the
            // forward lock: retry against whatever it points at now.
        }
    }

    // == Sweep Expired ==
    /// Evicts every entry whose expiry is strictly before the start of the
    /// pass and fires the hook for each. Returns the number evicted.
    ///
    /// Keys are snapshotted first; each removal re-checks expiry under the
    /// forward lock so a concurrent re-insert survives.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let candidates: Vec<K> = self
            .forward
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = Vec::with_capacity(candidates.len());
        for key in candidates {
            if let MapEntry::Occupied(occupied) = self.forward.entry(key) {
                if occupied.get().is_expired_at(now) {
                    self.unlink_reverse(occupied.key(), &occupied.get().value);
                    let (key, _) = occupied.remove_entry();
                    evicted.push(key);
                }
            }
        }

        let count = evicted.len();
        for key in evicted {
            self.stats.record_expiration();
            self.notify(key, EvictionCause::Expired);
        }
        count
    }

    // == Accessors ==
    /// Number of entries physically held, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.forward.len())
    }

    /// Key the reverse map currently associates with `value`.
    #[cfg(test)]
    pub(crate) fn reverse_owner(&self, value: &V) -> Option<K> {
        self.reverse.get(value).map(|owner| owner.value().clone())
    }

    #[cfg(test)]
    pub(crate) fn reverse_len(&self) -> usize {
        self.reverse.len()
    }

    // == Internals ==
    // Callers must hold the forward shard of `key`.
    fn link_reverse(&self, value: V, key: K) {
        if self.reverse.insert(value, key).is_some() {
            trace!("Value repointed to a new key");
        }
    }

    // Callers must hold the forward shard of `key`.
    fn unlink_reverse(&self, key: &K, value: &V) {
        self.reverse.remove_if(value, |_, owner| owner == key);
    }

    /// Runs the hook outside every map lock; a panic is contained and counted.
    fn notify(&self, key: K, cause: EvictionCause) {
        let Some(hook) = &self.on_evict else {
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| hook(key))).is_err() {
            self.stats.record_hook_panic();
            warn!(?cause, "Eviction hook panicked, continuing");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread::sleep;

    fn recording_hook() -> (EvictionHook<&'static str>, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let hook: EvictionHook<&'static str> =
            Arc::new(move |key: &'static str| sink.lock().unwrap().push(key));
        (hook, log)
    }

    #[test]
    fn test_store_put_and_get() {
        let store = BiStore::new(Duration::from_secs(60), None);

        store.put("a", 1);

        assert_eq!(store.get(&"a"), Some(1));
        assert_eq!(store.get(&"b"), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.reverse_owner(&1), Some("a"));
    }

    #[test]
    fn test_store_get_expired_is_absent_but_kept() {
        let store = BiStore::new(Duration::from_millis(20), None);

        store.put("a", 1);
        sleep(Duration::from_millis(40));

        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.len(), 1, "get must not remove expired entries");
        assert_eq!(store.reverse_owner(&1), Some("a"));
    }

    #[test]
    fn test_store_remove_by_key() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_secs(60), Some(hook));

        store.put("a", 1);

        assert_eq!(store.remove_by_key(&"a"), Some(1));
        assert_eq!(store.remove_by_key(&"a"), None);
        assert!(store.is_empty());
        assert_eq!(store.reverse_len(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_store_remove_by_key_ignores_expiry() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_millis(10), Some(hook));

        store.put("a", 1);
        sleep(Duration::from_millis(30));

        assert_eq!(store.remove_by_key(&"a"), Some(1));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_store_remove_by_value() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_secs(60), Some(hook));

        store.put("a", 1);

        assert_eq!(store.remove_by_value(&1), Some(1));
        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.remove_by_value(&1), None);
        assert!(store.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_store_miss_never_fires_hook() {
        let (hook, log) = recording_hook();
        let store: BiStore<&str, i32> = BiStore::new(Duration::from_secs(60), Some(hook));

        assert_eq!(store.remove_by_key(&"ghost"), None);
        assert_eq!(store.remove_by_value(&42), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_store_overwrite_drops_stale_reverse_entry() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_secs(60), Some(hook));

        store.put("a", 1);
        store.put("a", 2);

        assert_eq!(store.get(&"a"), Some(2));
        assert_eq!(store.reverse_owner(&1), None);
        assert_eq!(store.reverse_owner(&2), Some("a"));
        assert_eq!(store.remove_by_value(&1), None);
        assert!(log.lock().unwrap().is_empty(), "overwrite must not fire the hook");
    }

    #[test]
    fn test_store_overwrite_same_value_keeps_reverse_entry() {
        let store = BiStore::new(Duration::from_secs(60), None);

        store.put("a", 1);
        store.put("a", 1);

        assert_eq!(store.reverse_owner(&1), Some("a"));
        assert_eq!(store.reverse_len(), 1);
    }

    #[test]
    fn test_store_shared_value_repoints_reverse_entry() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_secs(60), Some(hook));

        store.put("a", 1);
        store.put("b", 1);

        // Both keys stay readable, only the newest is reachable by value
        assert_eq!(store.get(&"a"), Some(1));
        assert_eq!(store.reverse_owner(&1), Some("b"));

        // Removing the displaced key leaves the value's new owner alone
        assert_eq!(store.remove_by_key(&"a"), Some(1));
        assert_eq!(store.reverse_owner(&1), Some("b"));

        assert_eq!(store.remove_by_value(&1), Some(1));
        assert_eq!(store.get(&"b"), None);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_store_sweep_expired() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_millis(20), Some(hook));

        store.put("a", 1);
        store.put("b", 2);
        sleep(Duration::from_millis(40));
        store.put("c", 3);

        let removed = store.sweep_expired();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&"c"), Some(3));
        assert_eq!(store.reverse_len(), 1);

        let mut evicted = log.lock().unwrap().clone();
        evicted.sort();
        assert_eq!(evicted, vec!["a", "b"]);

        // Nothing left to evict, so no second firing
        assert_eq!(store.sweep_expired(), 0);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_store_panicking_hook_is_contained() {
        let hook: EvictionHook<&'static str> = Arc::new(|key: &'static str| {
            if key == "bad" {
                panic!("hook failure");
            }
        });
        let store = BiStore::new(Duration::from_millis(10), Some(hook));

        store.put("bad", 1);
        store.put("good", 2);
        sleep(Duration::from_millis(30));

        assert_eq!(store.sweep_expired(), 2);
        assert!(store.is_empty());
        assert_eq!(store.reverse_len(), 0);

        let stats = store.stats();
        assert_eq!(stats.expirations, 2);
        assert_eq!(stats.hook_panics, 1);
    }

    #[test]
    fn test_store_racing_remove_by_key_fires_once() {
        let (hook, log) = recording_hook();
        let store = BiStore::new(Duration::from_secs(60), Some(hook));

        for _ in 0..100 {
            store.put("k", 7);

            let results: Vec<Option<i32>> = std::thread::scope(|scope| {
                let first = scope.spawn(|| store.remove_by_key(&"k"));
                let second = scope.spawn(|| store.remove_by_value(&7));
                vec![first.join().unwrap(), second.join().unwrap()]
            });

            assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
            assert_eq!(store.reverse_len(), 0);
        }

        assert_eq!(log.lock().unwrap().len(), 100);
    }

    #[test]
    fn test_store_stats() {
        let store = BiStore::new(Duration::from_secs(60), None);

        store.put("a", 1);
        store.get(&"a");
        store.get(&"missing");
        store.remove_by_key(&"a");

        let stats = store.stats();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.entries, 0);
    }
}
