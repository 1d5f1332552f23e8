//! # Event classification
//! Keyword classifier turning a raw notice into a typed vidiprinter event.
//!
//! Rules are checked in a fixed priority order and the first hit wins, so a
//! notice mentioning both a red card and a goal is a `card`. Matching is plain
//! case-insensitive substring search over `title + " " + summary`.

use serde::{Deserialize, Serialize};

use crate::ingest::types::RawItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Goal,
    Card,
    Ht,
    Ft,
    #[serde(other)]
    Update,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Goal => "goal",
            EventKind::Card => "card",
            EventKind::Ht => "ht",
            EventKind::Ft => "ft",
            EventKind::Update => "update",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified notice. Serialized exactly as the feed endpoint emits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

// (needles, kind) in priority order.
const RULES: &[(&[&str], EventKind)] = &[
    (&["red card"], EventKind::Card),
    (&["goal"], EventKind::Goal),
    (&["half time", "ht"], EventKind::Ht),
    (&["full time", "ft"], EventKind::Ft),
];

pub fn classify(title: &str, summary: &str) -> EventKind {
    let text = format!("{title} {summary}").to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| text.contains(n)))
        .map(|(_, kind)| *kind)
        .unwrap_or(EventKind::Update)
}

pub fn normalize_event(item: RawItem) -> Event {
    let kind = classify(&item.title, &item.summary);
    Event {
        title: item.title,
        summary: item.summary,
        source: item.source,
        timestamp: item.timestamp,
        kind,
    }
}
