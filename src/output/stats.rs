//! Run statistics
//!
//! Counters are persisted inside every checkpoint, so totals survive resume.

use crate::state::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Crawl statistics accumulated by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages that reached `Visited`, with or without an error
    pub pages_processed: u64,

    /// Pages written to disk without error
    pub pages_succeeded: u64,

    /// Pages finished with an error or auto-skipped
    pub pages_failed: u64,

    /// Every recorded error, including failed fetches that were requeued
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,

    pub images_downloaded: u64,
    pub images_failed: u64,

    /// When the first run of this crawl started
    pub started_at: DateTime<Utc>,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            pages_processed: 0,
            pages_succeeded: 0,
            pages_failed: 0,
            errors_by_kind: BTreeMap::new(),
            images_downloaded: 0,
            images_failed: 0,
            started_at: Utc::now(),
        }
    }

    pub fn record_success(&mut self) {
        self.pages_processed += 1;
        self.pages_succeeded += 1;
    }

    /// A page was fetched but finished with a content or write error
    pub fn record_visited_with_error(&mut self, kind: ErrorKind) {
        self.pages_processed += 1;
        self.pages_failed += 1;
        self.record_error(kind);
    }

    /// A fetch failed after its retries; the URL may be requeued
    pub fn record_fetch_failure(&mut self, kind: ErrorKind) {
        self.record_error(kind);
    }

    /// A URL was abandoned after too many failures
    pub fn record_skipped(&mut self) {
        self.pages_failed += 1;
    }

    pub fn record_error(&mut self, kind: ErrorKind) {
        *self.errors_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn record_images(&mut self, downloaded: u64, failed: u64) {
        self.images_downloaded += downloaded;
        self.images_failed += failed;
    }

    pub fn errors_of(&self, kind: ErrorKind) -> u64 {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors_by_kind.values().sum()
    }

    /// Percentage of processed pages written without error
    pub fn success_rate(&self) -> f64 {
        if self.pages_processed == 0 {
            0.0
        } else {
            (self.pages_succeeded as f64 / self.pages_processed as f64) * 100.0
        }
    }

    /// Wall-clock time since the crawl first started
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}
