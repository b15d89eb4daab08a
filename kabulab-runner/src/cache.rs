//! Metrics cache — JSON-file backed, freshness decided by the caller.
//!
//! The engine never reads a clock; the cache is where staleness lives.
//! Every entry carries its fetch timestamp, and every lookup takes the
//! caller's `now`, so tests and replays can pin time wherever they want.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use kabulab_core::domain::StockMetrics;

/// One cached fundamentals record with its fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMetrics {
    pub value: StockMetrics,
    pub fetched_at: DateTime<Utc>,
}

/// Symbol-keyed fundamentals cache persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct MetricsCache {
    path: PathBuf,
    ttl: Duration,
    entries: BTreeMap<String, CachedMetrics>,
}

impl MetricsCache {
    /// Opens a cache file, or starts empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read metrics cache {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse metrics cache {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, ttl, entries })
    }

    /// Fresh value for `symbol`, judged against the caller's `now`.
    /// Stale or absent entries both come back as `None`.
    pub fn get(&self, symbol: &str, now: DateTime<Utc>) -> Option<&StockMetrics> {
        self.entries
            .get(symbol)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| &entry.value)
    }

    /// Stores a record under its symbol, replacing any previous entry.
    pub fn insert(&mut self, value: StockMetrics, fetched_at: DateTime<Utc>) {
        self.entries
            .insert(value.symbol.clone(), CachedMetrics { value, fetched_at });
    }

    /// Drops every entry stale at `now`. Returns how many were evicted.
    pub fn evict_stale(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.fetched_at) <= ttl);
        before - self.entries.len()
    }

    /// Writes the cache back to its file (pretty JSON, sorted by symbol).
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create cache directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .context("failed to serialize metrics cache")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write metrics cache {}", self.path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_fresh(&self, entry: &CachedMetrics, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.fetched_at) <= self.ttl
    }
}
