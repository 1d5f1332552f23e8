//! Single-slot response cache for the feed endpoint.
//!
//! The slot is a JSON file holding the ordered item array; its modification
//! time is the write instant the TTL is measured from. Writes go through a
//! temp file + rename so readers never observe a half-written entry.
//!
//! There is no lock around refresh. Two requests that both see an expired
//! entry will both aggregate and the last rename wins; with a TTL of a few
//! seconds that costs at most one redundant aggregation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use tokio::fs;

use crate::aggregator::FeedAggregator;
use crate::classify::Event;
use crate::config::feed::FeedConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub items: Vec<Event>,
    pub written_at: SystemTime,
}

impl CacheEntry {
    /// Age relative to now. A write time in the future counts as zero.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.written_at)
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_header(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    path: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        gauge!("feed_cache_ttl_secs").set(ttl.as_secs_f64());
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self::new(cfg.cache.path.clone(), cfg.ttl())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read the stored entry regardless of age. Missing or undecodable ⇒ `None`.
    pub async fn get(&self) -> Option<CacheEntry> {
        match self.read_entry().await {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(target: "cache", error = ?e, path = %self.path.display(), "no usable cache entry");
                None
            }
        }
    }

    /// Replace the whole entry; its age restarts at zero.
    pub async fn put(&self, items: &[Event]) -> Result<()> {
        static SEQ: AtomicU64 = AtomicU64::new(0);

        let json = serde_json::to_vec(items).context("encoding cache entry")?;
        let tmp = self.path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating cache dir {}", dir.display()))?;
        }
        fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", self.path.display()));
        }
        Ok(())
    }

    /// Serve the stored entry while it is younger than the TTL, otherwise
    /// aggregate, store, and serve the fresh result.
    pub async fn get_or_refresh(&self, aggregator: &FeedAggregator) -> (Vec<Event>, CacheStatus) {
        if let Some(entry) = self.get().await {
            if entry.age() < self.ttl {
                counter!("feed_cache_hits_total").increment(1);
                return (entry.items, CacheStatus::Hit);
            }
        }

        counter!("feed_cache_misses_total").increment(1);
        let items = aggregator.aggregate().await;
        if let Err(e) = self.put(&items).await {
            tracing::warn!(target: "cache", error = ?e, "cache write failed; serving uncached result");
            counter!("feed_cache_write_errors_total").increment(1);
        }
        (items, CacheStatus::Miss)
    }

    async fn read_entry(&self) -> Result<CacheEntry> {
        let written_at = fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .with_context(|| format!("stat {}", self.path.display()))?;
        let bytes = fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        let items: Vec<Event> =
            serde_json::from_slice(&bytes).context("decoding cache entry")?;
        Ok(CacheEntry { items, written_at })
    }
}
