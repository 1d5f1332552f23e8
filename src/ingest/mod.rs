// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{RawItem, SourceAdapter, SourceConfig};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Raw items parsed from sources.");
        describe_counter!(
            "feed_source_errors_total",
            "Source fetch/parse failures (absorbed as empty)."
        );
        describe_counter!(
            "feed_fallback_total",
            "Aggregations that fell back to the demo events."
        );
        describe_counter!("feed_cache_hits_total", "Feed requests served from cache.");
        describe_counter!(
            "feed_cache_misses_total",
            "Feed requests that re-ran aggregation."
        );
        describe_counter!(
            "feed_cache_write_errors_total",
            "Failed cache writes (fresh result still served)."
        );
        describe_histogram!("feed_parse_ms", "RSS parse time in milliseconds.");
        describe_histogram!("feed_aggregate_ms", "Aggregation time in milliseconds.");
        describe_gauge!("feed_cache_ttl_secs", "Configured cache TTL in seconds.");
    });
}

/// Strip markup from an entry body: drop tags, decode entities, trim.
pub fn strip_markup(s: &str) -> String {
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)<[^>]*>").unwrap());
    let no_tags = re_tags.replace_all(s, "");
    html_escape::decode_html_entities(&no_tags).trim().to_string()
}

/// Run every configured source in declaration order and concatenate the results.
///
/// Inert sources (empty url) are skipped. Each source's items stay contiguous and
/// in the order the source produced them.
pub async fn collect_raw(
    sources: &[SourceConfig],
    adapters: &[Box<dyn SourceAdapter>],
) -> Vec<RawItem> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for src in sources {
        if src.is_inert() {
            tracing::debug!(target: "ingest", source = %src.label, "skipping inert source");
            continue;
        }
        let Some(adapter) = adapters.iter().find(|a| a.kind() == src.kind) else {
            tracing::warn!(target: "ingest", source = %src.label, kind = src.kind.as_str(), "no adapter for source kind");
            counter!("feed_source_errors_total").increment(1);
            continue;
        };
        let mut items = adapter.fetch(src).await;
        tracing::debug!(target: "ingest", source = %src.label, items = items.len(), "source fetched");
        counter!("feed_items_total").increment(items.len() as u64);
        raw.append(&mut items);
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_removes_tags_and_trims() {
        let s = "  <p>84' - <b>Harbor United</b> score&nbsp;again</p>\n ";
        assert_eq!(strip_markup(s), "84' - Harbor United score\u{a0}again");
    }

    #[test]
    fn strip_markup_keeps_plain_text() {
        assert_eq!(strip_markup("Points shared."), "Points shared.");
        assert_eq!(strip_markup(""), "");
    }
}
