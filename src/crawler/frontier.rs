//! Frontier: the authoritative record of discovered URLs
//!
//! This module handles:
//! - Deduplication of discovered URLs by canonical form
//! - The FIFO queue of pending URLs
//! - State transitions and failure counting per URL
//! - Snapshot/restore for checkpointing

use crate::state::{ErrorKind, UrlRecord, UrlState};
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// What happened to a URL after a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// The URL reached the failure threshold and will never be fetched again
    AutoSkip,

    /// The URL went back to the tail of the queue
    Requeued,
}

/// Serializable view of the frontier
///
/// `records` are kept in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierSnapshot {
    pub records: Vec<UrlRecord>,
    pub pending_order: Vec<String>,
    pub visited_set: Vec<String>,
    pub skipped_set: Vec<String>,
}

/// Owns every URL record of a crawl
///
/// All mutation goes through the methods below so the queue, the visited set
/// and the record states never disagree:
/// - every queued URL is `Pending`
/// - `Visited`/`Skipped` URLs are never queued again
/// - the visited set holds exactly the `Visited` records
#[derive(Debug)]
pub struct Frontier {
    records: HashMap<String, UrlRecord>,
    discovery_order: Vec<String>,
    queue: VecDeque<String>,
    visited: HashSet<String>,
    skip_after_failures: u32,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `skip_after_failures` - Consecutive failed fetches before a URL is skipped
    pub fn new(skip_after_failures: u32) -> Self {
        Self {
            records: HashMap::new(),
            discovery_order: Vec::new(),
            queue: VecDeque::new(),
            visited: HashSet::new(),
            skip_after_failures: skip_after_failures.max(1),
        }
    }

    /// Adds a URL if it has never been seen
    ///
    /// # Returns
    ///
    /// * `true` - New `Pending` record appended to the queue
    /// * `false` - URL already known (in any state)
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.records.contains_key(url) {
            return false;
        }

        self.records.insert(url.to_string(), UrlRecord::new(url));
        self.discovery_order.push(url.to_string());
        self.queue.push_back(url.to_string());
        tracing::trace!(url = %url, queued = self.queue.len(), "Enqueued");
        true
    }

    /// Pops the next URL and marks it `InProgress`
    ///
    /// `None` means the crawl is exhausted.
    pub fn next_pending(&mut self) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            match self.records.get_mut(&url) {
                Some(record) if record.state == UrlState::Pending => {
                    record.state = UrlState::InProgress;
                    return Some(url);
                }
                _ => {
                    tracing::warn!(url = %url, "Dropping queue entry without a pending record");
                }
            }
        }
        None
    }

    /// Marks an in-progress URL as successfully processed
    ///
    /// Resets the failure counter and clears the last error.
    pub fn mark_visited(&mut self, url: &str) -> Result<()> {
        let record = self.transition(url, UrlState::Visited)?;
        record.consecutive_failures = 0;
        record.last_error = None;
        self.visited.insert(url.to_string());
        Ok(())
    }

    /// Marks an in-progress URL as processed but keeps `kind` as its error
    ///
    /// Used when the fetch succeeded but extraction, rendering or writing
    /// failed. The page is not retried.
    pub fn mark_visited_with_error(&mut self, url: &str, kind: ErrorKind) -> Result<()> {
        let record = self.transition(url, UrlState::Visited)?;
        record.consecutive_failures = 0;
        record.last_error = Some(kind);
        self.visited.insert(url.to_string());
        Ok(())
    }

    /// Records a failed fetch of an in-progress URL
    ///
    /// # Returns
    ///
    /// * `FailureDecision::AutoSkip` - The failure threshold was reached
    /// * `FailureDecision::Requeued` - The URL is pending again, at the tail
    pub fn mark_failed(&mut self, url: &str, kind: ErrorKind) -> Result<FailureDecision> {
        let skip_after = self.skip_after_failures;
        let record = self.in_progress_record(url, UrlState::Pending)?;
        record.consecutive_failures += 1;
        record.last_error = Some(kind);

        if record.consecutive_failures >= skip_after {
            record.state = UrlState::Skipped;
            tracing::debug!(
                url = %url,
                failures = record.consecutive_failures,
                "Failure threshold reached"
            );
            Ok(FailureDecision::AutoSkip)
        } else {
            record.state = UrlState::Pending;
            self.queue.push_back(url.to_string());
            Ok(FailureDecision::Requeued)
        }
    }

    /// Captures the current state for a checkpoint
    pub fn snapshot(&self) -> FrontierSnapshot {
        let records: Vec<UrlRecord> = self
            .discovery_order
            .iter()
            .filter_map(|url| self.records.get(url).cloned())
            .collect();

        let visited_set = records
            .iter()
            .filter(|r| r.state == UrlState::Visited)
            .map(|r| r.url.clone())
            .collect();

        let skipped_set = records
            .iter()
            .filter(|r| r.state == UrlState::Skipped)
            .map(|r| r.url.clone())
            .collect();

        FrontierSnapshot {
            records,
            pending_order: self.queue.iter().cloned().collect(),
            visited_set,
            skipped_set,
        }
    }

    /// Rebuilds a frontier from a checkpoint snapshot
    ///
    /// URLs that were `InProgress` when the snapshot was taken go back to
    /// `Pending` at the head of the queue, in record order, ahead of the saved
    /// queue. Pending records missing from the saved queue are appended so no
    /// discovered link is lost. Failure counters are kept.
    pub fn restore(snapshot: FrontierSnapshot, skip_after_failures: u32) -> Self {
        let mut frontier = Self::new(skip_after_failures);
        let mut interrupted = Vec::new();

        for mut record in snapshot.records {
            if frontier.records.contains_key(&record.url) {
                tracing::warn!(url = %record.url, "Duplicate record in checkpoint, keeping the first");
                continue;
            }

            match record.state {
                UrlState::InProgress => {
                    record.state = UrlState::Pending;
                    interrupted.push(record.url.clone());
                }
                UrlState::Visited => {
                    frontier.visited.insert(record.url.clone());
                }
                UrlState::Pending | UrlState::Skipped => {}
            }

            frontier.discovery_order.push(record.url.clone());
            frontier.records.insert(record.url.clone(), record);
        }

        let mut queued = HashSet::new();
        let saved_queue = snapshot.pending_order.into_iter();
        let leftovers: Vec<String> = frontier
            .discovery_order
            .iter()
            .filter(|url| {
                frontier
                    .records
                    .get(*url)
                    .map(|r| r.state == UrlState::Pending)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        for url in interrupted.into_iter().chain(saved_queue).chain(leftovers) {
            let is_pending = frontier
                .records
                .get(&url)
                .map(|r| r.state == UrlState::Pending)
                .unwrap_or(false);
            if is_pending && queued.insert(url.clone()) {
                frontier.queue.push_back(url);
            }
        }

        tracing::debug!(
            records = frontier.records.len(),
            pending = frontier.queue.len(),
            visited = frontier.visited.len(),
            "Frontier restored"
        );

        frontier
    }

    /// Number of known URLs in any state
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn get(&self, url: &str) -> Option<&UrlRecord> {
        self.records.get(url)
    }

    pub fn skip_after_failures(&self) -> u32 {
        self.skip_after_failures
    }

    /// URLs abandoned after too many failures, in discovery order
    pub fn skipped_urls(&self) -> Vec<String> {
        self.ordered_records()
            .filter(|r| r.state == UrlState::Skipped)
            .map(|r| r.url.clone())
            .collect()
    }

    /// Records that failed at least once or finished with an error
    pub fn failed_records(&self) -> Vec<&UrlRecord> {
        self.ordered_records().filter(|r| r.has_error()).collect()
    }

    fn ordered_records(&self) -> impl Iterator<Item = &UrlRecord> {
        self.discovery_order
            .iter()
            .filter_map(|url| self.records.get(url))
    }

    fn transition(&mut self, url: &str, to: UrlState) -> Result<&mut UrlRecord> {
        let record = self.in_progress_record(url, to)?;
        record.state = to;
        Ok(record)
    }

    fn in_progress_record(&mut self, url: &str, to: UrlState) -> Result<&mut UrlRecord> {
        let record = self
            .records
            .get_mut(url)
            .ok_or_else(|| MirrorError::UnknownUrl(url.to_string()))?;

        if !record.state.can_transition_to(to) {
            return Err(MirrorError::InvalidTransition {
                url: url.to_string(),
                from: record.state,
                to,
            });
        }

        Ok(record)
    }
}
