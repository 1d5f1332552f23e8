//! Prometheus recorder setup. The `/metrics` route itself lives in `api`.

use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder and publish the cache TTL gauge.
///
/// Fails if a recorder is already installed.
pub fn install_recorder(ttl_secs: u64) -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

    crate::ingest::ensure_metrics_described();
    gauge!("feed_cache_ttl_secs").set(ttl_secs as f64);

    Ok(handle)
}
