//! SQLite checkpoint backend
//!
//! Every save builds a fresh database next to the checkpoint, syncs it and
//! renames it over the previous one, so readers see either the previous
//! snapshot or the new one. An unreadable file at the checkpoint path is
//! simply replaced.

use crate::checkpoint::schema::initialize_schema;
use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::checkpoint::{completed_path, Checkpoint};
use crate::crawler::FrontierSnapshot;
use crate::output::writer::sibling_with_suffix;
use crate::output::CrawlStats;
use crate::state::{ErrorKind, UrlRecord, UrlState};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::fs::{self, File};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

/// Checkpoint store backed by a SQLite database file
///
/// The connection is opened per operation so the file can be deleted or
/// archived between saves.
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    path: PathBuf,
    config_hash: String,
}

impl SqliteCheckpointStore {
    pub fn new(path: &Path, config_hash: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            config_hash: config_hash.to_string(),
        }
    }

    fn write_database(&self, tmp_path: &Path, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        remove_if_exists(tmp_path)?;

        let mut conn = Connection::open(tmp_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = DELETE;
            PRAGMA synchronous = FULL;
        ",
        )?;
        initialize_schema(&conn)?;
        write_checkpoint(&mut conn, checkpoint)?;
        conn.close().map_err(|(_, e)| e)?;

        File::open(tmp_path)?.sync_all()?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = sibling_with_suffix(&self.path, ".tmp");
        if let Err(e) = self.write_database(&tmp_path, checkpoint) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        tracing::debug!(
            path = %self.path.display(),
            records = checkpoint.frontier.records.len(),
            "Checkpoint saved"
        );
        Ok(())
    }

    fn try_load(&self) -> CheckpointResult<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let checkpoint = read_checkpoint(&conn)?;
        checkpoint.validate(&self.config_hash)?;
        Ok(Some(checkpoint))
    }

    fn discard(&mut self) -> CheckpointResult<()> {
        remove_if_exists(&self.path)
    }

    fn archive(&mut self) -> CheckpointResult<PathBuf> {
        let target = completed_path(&self.path);
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

fn remove_if_exists(path: &Path) -> CheckpointResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn write_checkpoint(conn: &mut Connection, checkpoint: &Checkpoint) -> CheckpointResult<()> {
    let stats = serde_json::to_string(&checkpoint.stats)?;
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO checkpoint_meta (id, version, start_url, config_hash, saved_at, pages_processed, stats)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            checkpoint.version,
            checkpoint.start_url,
            checkpoint.config_hash,
            checkpoint.saved_at.to_rfc3339(),
            checkpoint.pages_processed as i64,
            stats,
        ],
    )?;

    {
        let mut insert_record = tx.prepare(
            "INSERT INTO url_records (seq, url, state, consecutive_failures, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (seq, record) in checkpoint.frontier.records.iter().enumerate() {
            insert_record.execute(params![
                seq as i64,
                record.url,
                record.state.to_db_string(),
                record.consecutive_failures,
                record.last_error.map(|kind| kind.to_db_string()),
            ])?;
        }

        let mut insert_pending =
            tx.prepare("INSERT INTO pending_queue (position, url) VALUES (?1, ?2)")?;
        for (position, url) in checkpoint.frontier.pending_order.iter().enumerate() {
            insert_pending.execute(params![position as i64, url])?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn read_checkpoint(conn: &Connection) -> CheckpointResult<Checkpoint> {
    let meta = conn
        .query_row(
            "SELECT version, start_url, config_hash, saved_at, pages_processed, stats
             FROM checkpoint_meta WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let (version, start_url, config_hash, saved_at, pages_processed, stats) =
        meta.ok_or_else(|| CheckpointError::Corrupt("missing checkpoint metadata".to_string()))?;

    let saved_at = DateTime::parse_from_rfc3339(&saved_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CheckpointError::Corrupt(format!("invalid saved_at: {}", e)))?;
    let stats: CrawlStats = serde_json::from_str(&stats)?;

    let mut stmt = conn.prepare(
        "SELECT url, state, consecutive_failures, last_error FROM url_records ORDER BY seq",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(rows.len());
    for (url, state, consecutive_failures, last_error) in rows {
        let state = UrlState::from_db_string(&state)
            .ok_or_else(|| CheckpointError::Corrupt(format!("unknown state '{}'", state)))?;
        let last_error = match last_error {
            Some(kind) => Some(
                ErrorKind::from_db_string(&kind)
                    .ok_or_else(|| CheckpointError::Corrupt(format!("unknown error kind '{}'", kind)))?,
            ),
            None => None,
        };
        records.push(UrlRecord {
            url,
            state,
            consecutive_failures,
            last_error,
        });
    }

    let mut stmt = conn.prepare("SELECT url FROM pending_queue ORDER BY position")?;
    let pending_order = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let urls_in = |state: UrlState| -> Vec<String> {
        records
            .iter()
            .filter(|r| r.state == state)
            .map(|r| r.url.clone())
            .collect()
    };
    let visited_set = urls_in(UrlState::Visited);
    let skipped_set = urls_in(UrlState::Skipped);

    Ok(Checkpoint {
        version,
        start_url,
        config_hash,
        saved_at,
        frontier: FrontierSnapshot {
            records,
            pending_order,
            visited_set,
            skipped_set,
        },
        pages_processed: u64::try_from(pages_processed).unwrap_or(0),
        stats,
    })
}
