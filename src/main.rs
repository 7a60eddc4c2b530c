//! TTL BiCache demo
//!
//! Runs a small session-token workload against the cache and logs
//! evictions until the tokens have all expired or Ctrl+C is pressed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_bicache::{CacheConfig, EvictionHook, TtlBiCache};

/// Entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache, which starts its sweep task
/// 4. Issue session tokens, look some up, revoke one by token
/// 5. Wait for the rest to expire (or Ctrl+C), then shut down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_bicache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("loading cache configuration")?;
    info!(
        "Configuration loaded: ttl={:?}, sweep_interval={:?}",
        config.ttl, config.sweep_interval
    );

    let on_evict: EvictionHook<String> = Arc::new(|user: String| {
        info!(%user, "Session evicted");
    });
    let sessions: TtlBiCache<String, String> = TtlBiCache::from_config(&config, Some(on_evict))
        .context("creating session cache")?;

    for (i, user) in ["alice", "bob", "carol"].iter().enumerate() {
        sessions.put(user.to_string(), format!("token-{:04}", i + 1));
    }

    if let Some(token) = sessions.get(&"alice".to_string()) {
        info!(%token, "alice is logged in");
    }

    // Revocation arrives with only the token in hand
    if sessions.remove_by_value(&"token-0002".to_string()).is_some() {
        info!("token-0002 revoked");
    }

    // Give the sweep one interval past expiry to report the rest
    let wait = config.ttl.saturating_add(config.sweep_interval.saturating_mul(2));
    tokio::select! {
        _ = tokio::time::sleep(wait) => {
            info!("All sessions expired");
        }
        result = signal::ctrl_c() => {
            result.context("installing Ctrl+C handler")?;
            info!("Received Ctrl+C, initiating shutdown...");
        }
    }

    sessions.shutdown();
    if !sessions.is_empty() {
        warn!("{} sessions still cached at shutdown", sessions.len());
    }

    let stats = serde_json::to_string(&sessions.stats()).context("encoding stats")?;
    info!("Final stats: {}", stats);

    // Let the sweep task log its exit
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}
