// src/ingest/providers/mod.rs
pub mod json;
pub mod rss;

use std::time::Duration;

use crate::ingest::types::SourceAdapter;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("vidiprinter/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for all source adapters.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "http client builder failed; using defaults");
            reqwest::Client::new()
        })
}

/// The two stock adapters sharing one client.
pub fn default_adapters(client: reqwest::Client) -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(rss::RssAdapter::new(client.clone())),
        Box::new(json::JsonAdapter::new(client)),
    ]
}

/// GET `url` and return the body; non-2xx is an error.
pub(crate) async fn fetch_body(client: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    use anyhow::Context;
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} status"))?;
    resp.text().await.context("read body")
}
