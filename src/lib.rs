// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod poller;
pub mod timestamp;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::FeedAggregator;
pub use crate::api::{router, AppState};
pub use crate::cache::{CacheEntry, CacheStatus, ResponseCache};
pub use crate::classify::{classify, normalize_event, Event, EventKind};
pub use crate::config::FeedConfig;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the feed router from config on disk (`FEED_CONFIG_PATH` or defaults).
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = FeedConfig::load_default()?;
    Ok(app_from_config(&cfg))
}

pub fn app_from_config(cfg: &FeedConfig) -> axum::Router {
    tracing::info!(
        sources = cfg.sources.len(),
        ttl_secs = cfg.cache.ttl_secs,
        cache = %cfg.cache.path.display(),
        "feed app configured"
    );
    router(AppState::from_config(cfg))
}

/// Install the tracing subscriber. `RUST_LOG` wins over the default filter;
/// `FEED_LOG_JSON=1` switches to JSON lines. Safe to call more than once.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidiprinter=info,warn"));

    let json = std::env::var("FEED_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
