//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the lifetime of a cache.
//!
//! # Tasks
//! - Expiry sweep: Evicts expired entries and fires the eviction hook

mod sweep;

pub use sweep::{spawn_sweep_task, SweepTask};
