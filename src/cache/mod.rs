//! Cache Module
//!
//! Provides the bidirectional in-memory cache with TTL expiry and eviction hooks.

mod bicache;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use bicache::TtlBiCache;
pub(crate) use entry::Entry;
pub(crate) use stats::CacheStats;
pub(crate) use store::BiStore;

pub use stats::StatsSnapshot;
pub use store::EvictionHook;
