//! Configuration Module
//!
//! Cache timing parameters, fixed for the lifetime of a cache.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default entry time-to-live in milliseconds (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 300_000;

/// Default period between background sweeps in milliseconds
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Longest accepted TTL or sweep interval (10 years). Expiry and tick
/// instants are computed as `now + duration`, which must stay representable.
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Cache configuration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Added to the insertion time to compute an entry's expiry
    pub ttl: Duration,
    /// Period between background expiry scans
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a config from explicit durations. Call [`validate`](Self::validate)
    /// or hand it to the cache, which validates it.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            ttl,
            sweep_interval,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds (default: 300000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep period in milliseconds (default: 1000)
    ///
    /// Unlike a missing variable, an unparsable one is an error.
    pub fn from_env() -> Result<Self> {
        let ttl_ms = env_millis("CACHE_TTL_MS", DEFAULT_TTL_MS)?;
        let sweep_ms = env_millis("CACHE_SWEEP_INTERVAL_MS", DEFAULT_SWEEP_INTERVAL_MS)?;

        let config = Self::new(
            Duration::from_millis(ttl_ms),
            Duration::from_millis(sweep_ms),
        );
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero durations and durations above [`MAX_DURATION`].
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "ttl must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.ttl > MAX_DURATION {
            return Err(CacheError::InvalidConfig(format!(
                "ttl must not exceed {:?}",
                MAX_DURATION
            )));
        }
        if self.sweep_interval > MAX_DURATION {
            return Err(CacheError::InvalidConfig(format!(
                "sweep interval must not exceed {:?}",
                MAX_DURATION
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(DEFAULT_TTL_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}

fn env_millis(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CacheError::InvalidConfig(format!("{} is not a millisecond count: {:?}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
