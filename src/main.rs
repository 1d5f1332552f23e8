//! Live vidiprinter server entrypoint.
//! Boots the Axum HTTP server: feed endpoint, sources listing, health, metrics.

use shuttle_axum::ShuttleAxum;

use vidiprinter::{metrics::install_recorder, router, AppState, FeedConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    vidiprinter::init_tracing();

    let cfg = FeedConfig::load_default()?;

    let mut state = AppState::from_config(&cfg);
    match install_recorder(cfg.cache.ttl_secs) {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }
    tracing::info!(
        sources = cfg.sources.len(),
        ttl_secs = cfg.cache.ttl_secs,
        metrics = state.metrics.is_some(),
        "feed app configured"
    );

    Ok(router(state).into())
}
