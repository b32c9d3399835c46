//! JSON file checkpoint backend

use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::checkpoint::{completed_path, Checkpoint};
use crate::output::writer::sibling_with_suffix;
use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

/// Stores the checkpoint as a single JSON document
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
    config_hash: String,
}

impl JsonCheckpointStore {
    pub fn new(path: &Path, config_hash: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            config_hash: config_hash.to_string(),
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        let encoded = serde_json::to_vec_pretty(checkpoint)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = sibling_with_suffix(&self.path, ".tmp");
        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!(
            path = %self.path.display(),
            records = checkpoint.frontier.records.len(),
            "Checkpoint saved"
        );
        Ok(())
    }

    fn try_load(&self) -> CheckpointResult<Option<Checkpoint>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let checkpoint: Checkpoint = serde_json::from_str(&contents)?;
        checkpoint.validate(&self.config_hash)?;
        Ok(Some(checkpoint))
    }

    fn discard(&mut self) -> CheckpointResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn archive(&mut self) -> CheckpointResult<PathBuf> {
        let target = completed_path(&self.path);
        fs::rename(&self.path, &target).map_err(CheckpointError::Io)?;
        Ok(target)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::test_support::{sample_checkpoint, HASH};

    fn store(dir: &Path) -> JsonCheckpointStore {
        JsonCheckpointStore::new(&dir.join("recovery_state.json"), HASH)
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(!store.exists());
        assert!(store.try_load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        let checkpoint = sample_checkpoint();

        store.save(&checkpoint).unwrap();
        assert!(store.exists());
        assert!(!dir.path().join("recovery_state.json.tmp").exists());

        let loaded = store.try_load().unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonCheckpointStore::new(&dir.path().join("state/run.json"), HASH);
        store.save(&sample_checkpoint()).unwrap();
        assert!(dir.path().join("state/run.json").exists());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        fs::write(store.location(), "{ not json").unwrap();

        assert!(matches!(
            store.try_load().unwrap_err(),
            CheckpointError::Serialization(_)
        ));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_stale_config_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = store(dir.path());
        writer.save(&sample_checkpoint()).unwrap();

        let reader = JsonCheckpointStore::new(writer.location(), "different");
        assert!(matches!(
            reader.try_load().unwrap_err(),
            CheckpointError::ConfigChanged
        ));
    }

    #[test]
    fn test_discard() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        store.save(&sample_checkpoint()).unwrap();

        store.discard().unwrap();
        assert!(!store.exists());
        // Discarding twice is fine
        store.discard().unwrap();
    }

    #[test]
    fn test_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        store.save(&sample_checkpoint()).unwrap();

        let archived = store.archive().unwrap();
        assert_eq!(archived, dir.path().join("recovery_state.json.completed"));
        assert!(archived.exists());
        assert!(!store.exists());
    }
}
