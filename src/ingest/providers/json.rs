use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use metrics::counter;
use serde_json::Value;

use crate::ingest::types::{RawItem, SourceAdapter, SourceConfig, SourceKind};

const DEFAULT_TITLE: &str = "Live update";

/// Structured-data adapter: a JSON endpoint returning a top-level array of entries.
pub struct JsonAdapter {
    client: reqwest::Client,
}

impl JsonAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Decode a JSON payload into raw items labelled with `label`.
    ///
    /// Missing fields get defaults (`now` is used for a missing timestamp).
    /// Anything other than a top-level array is an error.
    pub fn parse_entries(body: &str, label: &str, now: &str) -> Result<Vec<RawItem>> {
        let data: Value = serde_json::from_str(body).context("decoding json payload")?;
        let Value::Array(entries) = data else {
            anyhow::bail!("json payload is not a list");
        };

        Ok(entries
            .iter()
            .map(|entry| RawItem {
                title: string_field(entry, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                summary: string_field(entry, "summary").unwrap_or_default(),
                source: label.to_string(),
                timestamp: string_field(entry, "timestamp").unwrap_or_else(|| now.to_string()),
            })
            .collect())
    }

    async fn try_fetch(&self, source: &SourceConfig) -> Result<Vec<RawItem>> {
        let body = super::fetch_body(&self.client, &source.url).await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        Self::parse_entries(&body, &source.label, &now)
    }
}

/// Scalars are taken as text; `null`, objects and arrays count as missing.
fn string_field(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl SourceAdapter for JsonAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Vec<RawItem> {
        if source.is_inert() {
            return Vec::new();
        }
        match self.try_fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = %source.label, "json source failed");
                counter!("feed_source_errors_total").increment(1);
                Vec::new()
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Structured
    }
}
