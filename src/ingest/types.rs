// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// One notice as a source delivered it. `timestamp` is the source's own text
/// (RFC 2822 for RSS `pubDate`, usually RFC 3339 for JSON) and is not parsed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS channel (`rss > channel > item`).
    #[serde(alias = "rss")]
    Feed,
    /// Top-level JSON array of `{title, summary, timestamp}` objects.
    #[serde(alias = "json")]
    Structured,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::Structured => "structured",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub label: String,
    #[serde(alias = "type")]
    pub kind: SourceKind,
    /// Empty means the source is configured but inert.
    #[serde(default)]
    pub url: String,
}

impl SourceConfig {
    pub fn new(label: impl Into<String>, kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind,
            url: url.into(),
        }
    }

    pub fn is_inert(&self) -> bool {
        self.url.trim().is_empty()
    }
}

/// Uniform fetch contract for every source format.
///
/// `fetch` never fails: transport and parse errors are logged and collapse into
/// an empty list, which is indistinguishable from a source that simply had
/// nothing to say.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Vec<RawItem>;
    fn kind(&self) -> SourceKind;
}
