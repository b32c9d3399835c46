//! Checkpoint store trait and error types

use crate::checkpoint::Checkpoint;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while saving or loading a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Configuration changed since the checkpoint was saved")]
    ConfigChanged,

    #[error("Corrupt checkpoint: {0}")]
    Corrupt(String),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Durable storage for crawl snapshots
///
/// Implementations must make `save` atomic: a crash mid-save leaves either
/// the previous checkpoint or the new one, never a mix.
pub trait CheckpointStore: Send {
    /// Replaces the stored checkpoint
    fn save(&mut self, checkpoint: &Checkpoint) -> CheckpointResult<()>;

    /// Reads and validates the stored checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Checkpoint))` - A valid checkpoint exists
    /// * `Ok(None)` - No checkpoint exists
    /// * `Err(CheckpointError)` - The checkpoint is unreadable, corrupt or stale
    fn try_load(&self) -> CheckpointResult<Option<Checkpoint>>;

    /// Like `try_load`, but logs errors and treats them as "no checkpoint"
    fn load(&self) -> Option<Checkpoint> {
        match self.try_load() {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    path = %self.location().display(),
                    error = %e,
                    "Ignoring unusable checkpoint, starting fresh"
                );
                None
            }
        }
    }

    /// Deletes the stored checkpoint, if any
    fn discard(&mut self) -> CheckpointResult<()>;

    /// Keeps the checkpoint as `<file>.completed` for auditing
    fn archive(&mut self) -> CheckpointResult<PathBuf>;

    fn exists(&self) -> bool;

    fn location(&self) -> &Path;
}
