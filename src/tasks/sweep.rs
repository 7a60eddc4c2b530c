//! Expiry Sweep Task
//!
//! Background task that periodically evicts expired cache entries.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::cache::BiStore;
use crate::error::{CacheError, Result};

/// Handle to a running sweep task.
///
/// Dropping it closes the shutdown channel, which also stops the task.
#[derive(Debug)]
pub struct SweepTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Asks the task to stop. Idempotent; takes effect before the next pass.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// True until the task loop has exited.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Spawns a task on the current tokio runtime that sweeps `store` every
/// `interval`, the first pass one interval from now.
///
/// The task only holds a weak reference: once every owner of the store is
/// gone the next tick finds nothing to upgrade and the loop ends.
///
/// # Errors
/// `CacheError::NoRuntime` when called outside a tokio runtime.
///
/// # Example
/// ```ignore
/// let store = Arc::new(BiStore::new(Duration::from_secs(60), None));
/// let sweeper = spawn_sweep_task(Arc::downgrade(&store), Duration::from_secs(1))?;
/// // Later:
/// sweeper.shutdown();
/// ```
pub fn spawn_sweep_task<K, V>(store: Weak<BiStore<K, V>>, interval: Duration) -> Result<SweepTask>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Eq + Hash + Clone + Send + Sync + 'static,
{
    let runtime = Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?;
    let (shutdown, mut stop) = watch::channel(false);

    let handle = runtime.spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    // Err means the sender went away with the cache
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let Some(store) = store.upgrade() else {
                break;
            };
            let removed = store.sweep_expired();
            drop(store);

            if removed > 0 {
                debug!("Expiry sweep: evicted {} entries", removed);
            } else {
                trace!("Expiry sweep: no expired entries found");
            }
        }

        info!("Expiry sweep task stopped");
    });

    Ok(SweepTask { shutdown, handle })
}
