use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::strip_markup;
use crate::ingest::types::{RawItem, SourceAdapter, SourceConfig, SourceKind};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Feed-style adapter: RSS 2.0 channels.
pub struct RssAdapter {
    client: reqwest::Client,
}

impl RssAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Parse an RSS document into raw items labelled with `label`.
    ///
    /// A document without `<channel>` is an error; a channel without items is not.
    pub fn parse_channel(xml: &str, label: &str) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let out = rss
            .channel
            .item
            .into_iter()
            .map(|it| RawItem {
                title: it.title.unwrap_or_default(),
                summary: strip_markup(it.description.as_deref().unwrap_or_default()),
                source: label.to_string(),
                timestamp: it.pub_date.unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        Ok(out)
    }

    async fn try_fetch(&self, source: &SourceConfig) -> Result<Vec<RawItem>> {
        let body = super::fetch_body(&self.client, &source.url).await?;
        Self::parse_channel(&body, &source.label)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Vec<RawItem> {
        match self.try_fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = %source.label, "rss source failed");
                counter!("feed_source_errors_total").increment(1);
                Vec::new()
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }
}

/// HTML named entities are not valid XML; swap the common ones before parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
