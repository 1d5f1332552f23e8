//! Instant parsing shared by the aggregator's sort and the poller's watermark.

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Parse a source timestamp: RFC 3339 (`2024-09-14T15:42:00+00:00`) first,
/// then RFC 2822 (`Sat, 14 Sep 2024 15:42:00 +0000`, the RSS `pubDate` form),
/// then offset-less ISO / SQL forms (`2024-09-14T15:42:00`, `2024-09-14 15:42:00`),
/// which are read as UTC.
pub fn parse_instant(ts: &str) -> Option<OffsetDateTime> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    OffsetDateTime::parse(ts, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc2822))
        .ok()
        .or_else(|| parse_naive(ts).map(PrimitiveDateTime::assume_utc))
}

fn parse_naive(ts: &str) -> Option<PrimitiveDateTime> {
    let forms = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ];
    forms
        .iter()
        .find_map(|form| PrimitiveDateTime::parse(ts, *form).ok())
}

/// Format an instant the way fallback events and JSON defaults are stamped.
pub fn format_rfc3339(at: OffsetDateTime) -> String {
    at.replace_nanosecond(0)
        .unwrap_or(at)
        .format(&Rfc3339)
        .unwrap_or_default()
}
