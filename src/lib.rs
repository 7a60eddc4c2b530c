//! TTL BiCache - A concurrent in-memory bidirectional cache
//!
//! Key/value lookups in both directions with a fixed time-to-live, a
//! background expiry sweep, and an eviction hook.

pub mod cache;
pub mod config;
pub mod error;
pub(crate) mod tasks;

pub use cache::{EvictionHook, StatsSnapshot, TtlBiCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
