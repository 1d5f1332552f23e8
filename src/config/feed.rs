// src/config/feed.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::ingest::types::{SourceConfig, SourceKind};

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "FEED_CACHE_TTL_SECS";
pub const ENV_CACHE_PATH: &str = "FEED_CACHE_PATH";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "FEED_HTTP_TIMEOUT_SECS";

pub const DEFAULT_CACHE_TTL_SECS: u64 = 12;
pub const DEFAULT_CACHE_PATH: &str = "feed-cache.json";

fn default_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}
fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// A demo event used when every source comes back empty.
/// `age_secs` is how long before aggregation time it is stamped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackEvent {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            path: default_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Declaration order is aggregation order.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Newest first.
    #[serde(default = "default_fallback")]
    pub fallback: Vec<FallbackEvent>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            cache: CacheSection::default(),
            http_timeout_secs: default_http_timeout(),
            fallback: default_fallback(),
        }
    }
}

impl FeedConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $FEED_CONFIG_PATH
    /// 2) config/feed.toml
    /// 3) config/feed.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("FEED_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/feed.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/feed.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ttl) = parse_u64_env(ENV_CACHE_TTL_SECS) {
            self.cache.ttl_secs = ttl;
        }
        if let Ok(p) = std::env::var(ENV_CACHE_PATH) {
            if !p.trim().is_empty() {
                self.cache.path = PathBuf::from(p.trim());
            }
        }
        if let Some(t) = parse_u64_env(ENV_HTTP_TIMEOUT_SECS) {
            self.http_timeout_secs = t;
        }
    }
}

fn parse_u64_env(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<FeedConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing feed config json");
    }
    match toml::from_str(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!(toml_err))
            .context("parsing feed config (toml, then json)"),
    }
}

pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "Twitter (via Nitter RSS)",
            SourceKind::Feed,
            "https://nitter.net/search/rss?f=tweets&q=goal%20OR%20red%20card%20OR%20full%20time%20OR%20half%20time",
        ),
        SourceConfig::new(
            "Club Announcements (RSS)",
            SourceKind::Feed,
            "https://www.bbc.co.uk/sport/football/rss.xml",
        ),
        SourceConfig::new("Live Blog (JSON)", SourceKind::Structured, ""),
    ]
}

/// Four demo events, newest first, one per category.
pub fn default_fallback() -> Vec<FallbackEvent> {
    vec![
        FallbackEvent {
            title: "GOAL: Harbor United 2-1 Oldbridge".into(),
            summary: "84' - Harbor United score from a quick free kick to edge ahead.".into(),
            source: "Demo feed".into(),
            age_secs: 2 * 60,
        },
        FallbackEvent {
            title: "RED CARD: Atlas City vs Wellington".into(),
            summary: "78' - Wellington reduced to ten men after a late challenge.".into(),
            source: "Demo feed".into(),
            age_secs: 5 * 60,
        },
        FallbackEvent {
            title: "HALF TIME: Northchester 1-0 Riverside".into(),
            summary: "Northchester lead with a first-half strike.".into(),
            source: "Demo feed".into(),
            age_secs: 12 * 60,
        },
        FallbackEvent {
            title: "FULL TIME: Southbay 0-0 Kingsport".into(),
            summary: "Points shared after a stubborn defensive display.".into(),
            source: "Demo feed".into(),
            age_secs: 18 * 60,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_with_partial_sections_fills_defaults() {
        let s = r#"
            [[sources]]
            label = "Club RSS"
            type = "rss"
            url = "http://localhost/rss.xml"

            [[sources]]
            label = "Live Blog"
            kind = "json"

            [cache]
            ttl_secs = 30
        "#;
        let cfg = parse_config(s, "toml").unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sources[0].kind, SourceKind::Feed);
        assert_eq!(cfg.sources[1].kind, SourceKind::Structured);
        assert!(cfg.sources[1].is_inert());
        assert_eq!(cfg.cache.ttl_secs, 30);
        assert_eq!(cfg.cache.path, PathBuf::from(DEFAULT_CACHE_PATH));
        assert_eq!(cfg.fallback.len(), 4);
    }

    #[test]
    fn json_config_is_accepted() {
        let s = r#"{"sources": [{"label": "A", "kind": "feed", "url": "http://a"}], "cache": {"ttl_secs": 5}}"#;
        let cfg = parse_config(s, "json").unwrap();
        assert_eq!(cfg.sources[0].label, "A");
        assert_eq!(cfg.ttl(), Duration::from_secs(5));
        // unknown extension: toml fails, json succeeds
        let cfg2 = parse_config(s, "").unwrap();
        assert_eq!(cfg2.sources.len(), 1);
    }

    #[test]
    fn garbage_config_is_an_error() {
        assert!(parse_config("sources = [", "toml").is_err());
    }

    #[test]
    fn default_fallback_is_newest_first() {
        let fb = default_fallback();
        assert_eq!(fb.len(), 4);
        assert!(fb.windows(2).all(|w| w[0].age_secs < w[1].age_secs));
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("feed.toml");
        fs::write(&p, "[cache]\nttl_secs = 30\n").unwrap();

        std::env::set_var(ENV_CACHE_TTL_SECS, "3");
        std::env::set_var(ENV_CACHE_PATH, "/tmp/vidiprinter-test-cache.json");
        let cfg = FeedConfig::load_from(&p).unwrap();
        std::env::remove_var(ENV_CACHE_TTL_SECS);
        std::env::remove_var(ENV_CACHE_PATH);

        assert_eq!(cfg.cache.ttl_secs, 3);
        assert_eq!(
            cfg.cache.path,
            PathBuf::from("/tmp/vidiprinter-test-cache.json")
        );
        assert_eq!(cfg.sources, default_sources());
    }

    #[serial_test::serial]
    #[test]
    fn missing_env_path_is_an_error() {
        std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/feed.toml");
        let res = FeedConfig::load_default();
        std::env::remove_var(ENV_CONFIG_PATH);
        assert!(res.is_err());
    }
}
