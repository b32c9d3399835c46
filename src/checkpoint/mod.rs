//! Checkpoint module for saving and restoring crawl progress
//!
//! A checkpoint is a complete snapshot of the frontier plus run statistics.
//! Two backends are provided:
//! - JSON file (default), written via temp file + fsync + rename
//! - SQLite database, selected when the recovery file ends in `.db`,
//!   `.sqlite` or `.sqlite3`; all rows are replaced in one transaction
//!
//! # Example
//!
//! ```no_run
//! use doc_mirror::checkpoint::open_store;
//! use std::path::Path;
//!
//! let store = open_store(Path::new("./recovery_state.json"), "config-hash");
//! if let Some(checkpoint) = store.load() {
//!     println!("{} pages processed so far", checkpoint.pages_processed);
//! }
//! ```

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonCheckpointStore;
pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};

use crate::crawler::FrontierSnapshot;
use crate::output::CrawlStats;
use crate::state::UrlState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Format version written into every checkpoint
pub const CHECKPOINT_VERSION: u32 = 1;

/// A complete snapshot of a crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub start_url: String,

    /// SHA-256 of the configuration file the crawl was started with
    pub config_hash: String,

    pub saved_at: DateTime<Utc>,

    /// Records, pending order, visited and skipped sets
    #[serde(flatten)]
    pub frontier: FrontierSnapshot,

    /// Save-counter base: pages processed across all runs
    pub pages_processed: u64,

    pub stats: CrawlStats,
}

impl Checkpoint {
    pub fn new(
        start_url: &str,
        config_hash: &str,
        frontier: FrontierSnapshot,
        stats: CrawlStats,
    ) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            start_url: start_url.to_string(),
            config_hash: config_hash.to_string(),
            saved_at: Utc::now(),
            frontier,
            pages_processed: stats.pages_processed,
            stats,
        }
    }

    /// Checks the checkpoint against the running configuration and itself
    ///
    /// - the version is supported and the config hash matches
    /// - every record URL is unique
    /// - every pending URL has a `Pending` or `InProgress` record
    /// - the visited set is exactly the `Visited` records
    /// - every skipped URL has a `Skipped` record
    pub fn validate(&self, expected_config_hash: &str) -> CheckpointResult<()> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                found: self.version,
                expected: CHECKPOINT_VERSION,
            });
        }

        if self.config_hash != expected_config_hash {
            return Err(CheckpointError::ConfigChanged);
        }

        let mut states: HashMap<&str, UrlState> = HashMap::new();
        for record in &self.frontier.records {
            if states.insert(record.url.as_str(), record.state).is_some() {
                return Err(CheckpointError::Corrupt(format!(
                    "duplicate record for {}",
                    record.url
                )));
            }
        }

        let mut pending = HashSet::new();
        for url in &self.frontier.pending_order {
            match states.get(url.as_str()) {
                Some(UrlState::Pending) | Some(UrlState::InProgress) => {}
                Some(state) => {
                    return Err(CheckpointError::Corrupt(format!(
                        "queued URL {} is {}",
                        url, state
                    )))
                }
                None => {
                    return Err(CheckpointError::Corrupt(format!(
                        "queued URL {} has no record",
                        url
                    )))
                }
            }
            if !pending.insert(url.as_str()) {
                return Err(CheckpointError::Corrupt(format!("{} queued twice", url)));
            }
        }

        check_set(&states, &self.frontier.visited_set, UrlState::Visited)?;
        check_set(&states, &self.frontier.skipped_set, UrlState::Skipped)?;

        let visited_records = states
            .values()
            .filter(|state| **state == UrlState::Visited)
            .count();
        if visited_records != self.frontier.visited_set.len() {
            return Err(CheckpointError::Corrupt(format!(
                "{} visited records but {} visited URLs",
                visited_records,
                self.frontier.visited_set.len()
            )));
        }

        Ok(())
    }
}

fn check_set(
    states: &HashMap<&str, UrlState>,
    urls: &[String],
    expected: UrlState,
) -> CheckpointResult<()> {
    let mut seen = HashSet::new();
    for url in urls {
        if states.get(url.as_str()) != Some(&expected) {
            return Err(CheckpointError::Corrupt(format!(
                "{} listed as {} without a matching record",
                url, expected
            )));
        }
        if !seen.insert(url.as_str()) {
            return Err(CheckpointError::Corrupt(format!("{} listed twice", url)));
        }
    }
    Ok(())
}

/// Returns true if `path` selects the SQLite backend
pub fn is_sqlite_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("db") | Some("sqlite") | Some("sqlite3")
    )
}

/// Opens the backend matching the recovery file's extension
pub fn open_store(path: &Path, config_hash: &str) -> Box<dyn CheckpointStore> {
    if is_sqlite_path(path) {
        Box::new(SqliteCheckpointStore::new(path, config_hash))
    } else {
        Box::new(JsonCheckpointStore::new(path, config_hash))
    }
}

/// `<file>.completed`
pub(crate) fn completed_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".completed");
    path.with_file_name(name)
}
