//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Lookups never fail;
//! only construction can.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Rejected configuration (zero TTL, zero sweep interval, bad env value)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No tokio runtime to host the background sweep task
    #[error("No runtime: {0}")]
    NoRuntime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
