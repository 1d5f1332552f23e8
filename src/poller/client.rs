use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::classify::{Event, EventKind};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/?action=feed";

/// Fetches one feed snapshot for the poller.
#[async_trait]
pub trait FeedClient: Send + Sync + 'static {
    async fn fetch_items(&self) -> Result<Vec<Event>>;
}

// Lenient wire shape: a missing or null `items` is an empty batch and missing
// item fields fall back to empty values.
#[derive(Debug, Deserialize)]
struct WireFeed {
    #[serde(default)]
    items: Option<Vec<WireItem>>,
}

#[derive(Debug, Deserialize)]
struct WireItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    timestamp: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: EventKind,
}

fn default_kind() -> EventKind {
    EventKind::Update
}

impl From<WireItem> for Event {
    fn from(w: WireItem) -> Self {
        Event {
            title: w.title,
            summary: w.summary,
            source: w.source,
            timestamp: w.timestamp,
            kind: w.kind,
        }
    }
}

/// Decode a feed endpoint body into its item list.
pub fn decode_feed(body: &str) -> Result<Vec<Event>> {
    let wire: WireFeed = serde_json::from_str(body).context("decoding feed body")?;
    Ok(wire
        .items
        .unwrap_or_default()
        .into_iter()
        .map(Event::from)
        .collect())
}

/// Polls the vidiprinter feed endpoint over HTTP.
pub struct HttpFeedClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpFeedClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_items(&self) -> Result<Vec<Event>> {
        let body = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("GET {}", self.endpoint))?
            .text()
            .await
            .context("read feed body")?;
        decode_feed(&body)
    }
}
