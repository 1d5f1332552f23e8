//! # Feed aggregation
//! Runs every configured source, falls back to demo events when all of them
//! come back empty, classifies, and orders newest first.

use metrics::{counter, histogram};
use time::{Duration as TimeDuration, OffsetDateTime};

use crate::classify::{normalize_event, Event};
use crate::config::feed::{FallbackEvent, FeedConfig};
use crate::ingest::{self, providers, types::RawItem, types::SourceAdapter, types::SourceConfig};
use crate::timestamp::{format_rfc3339, parse_instant};

pub struct FeedAggregator {
    sources: Vec<SourceConfig>,
    adapters: Vec<Box<dyn SourceAdapter>>,
    fallback: Vec<FallbackEvent>,
}

impl FeedAggregator {
    pub fn new(
        sources: Vec<SourceConfig>,
        adapters: Vec<Box<dyn SourceAdapter>>,
        fallback: Vec<FallbackEvent>,
    ) -> Self {
        Self {
            sources,
            adapters,
            fallback,
        }
    }

    /// Aggregator with the stock RSS/JSON adapters.
    pub fn from_config(cfg: &FeedConfig) -> Self {
        let client = providers::http_client(cfg.http_timeout());
        Self::new(
            cfg.sources.clone(),
            providers::default_adapters(client),
            cfg.fallback.clone(),
        )
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// One aggregation cycle. Never fails; failed sources just contribute nothing.
    pub async fn aggregate(&self) -> Vec<Event> {
        let t0 = std::time::Instant::now();

        let mut raw = ingest::collect_raw(&self.sources, &self.adapters).await;
        if raw.is_empty() {
            tracing::info!(target: "ingest", "all sources empty; serving fallback events");
            counter!("feed_fallback_total").increment(1);
            raw = materialize_fallback(&self.fallback, OffsetDateTime::now_utc());
        }

        let events = sort_newest_first(raw.into_iter().map(normalize_event).collect());

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_aggregate_ms").record(ms);
        tracing::info!(target: "ingest", items = events.len(), elapsed_ms = ms, "aggregation done");
        events
    }
}

/// Stamp fallback events relative to `now`. Entries whose age reaches outside
/// the representable date range are skipped.
pub fn materialize_fallback(fallback: &[FallbackEvent], now: OffsetDateTime) -> Vec<RawItem> {
    fallback
        .iter()
        .filter_map(|f| {
            let Some(at) = i64::try_from(f.age_secs)
                .ok()
                .and_then(|secs| now.checked_sub(TimeDuration::seconds(secs)))
            else {
                tracing::warn!(target: "ingest", title = %f.title, age_secs = f.age_secs, "fallback age out of range; skipped");
                return None;
            };
            Some(RawItem {
                title: f.title.clone(),
                summary: f.summary.clone(),
                source: f.source.clone(),
                timestamp: format_rfc3339(at),
            })
        })
        .collect()
}

/// Stable sort, newest first. Unparseable timestamps sink below every parseable one
/// and keep their relative order.
pub fn sort_newest_first(events: Vec<Event>) -> Vec<Event> {
    let mut keyed: Vec<(Option<OffsetDateTime>, Event)> = events
        .into_iter()
        .map(|e| (parse_instant(&e.timestamp), e))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, e)| e).collect()
}
