//! Checkpoint manager
//!
//! Tracks the highest fully-processed line per dataset and persists it to a
//! JSON file in the cache directory on a timer, bounding crash rework to at
//! most one interval's worth of lines without per-record I/O amplification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::models::Dataset;

/// Durable marker of ingestion progress for one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub dataset: String,
    pub last_processed_line: u64,
    pub saved_at: DateTime<Utc>,
}

/// Saves and loads per-dataset checkpoints under the cache directory
///
/// One manager is created per dataset run; `last_processed_line` is kept
/// monotonically non-decreasing for the lifetime of the run.
pub struct CheckpointManager {
    dir: PathBuf,
    interval: Duration,
    last_save: Option<Instant>,
    last_line: u64,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
            last_save: None,
            last_line: 0,
        }
    }

    /// Checkpoint file path for a dataset
    pub fn path(&self, dataset: Dataset) -> PathBuf {
        self.dir.join(format!("{dataset}.checkpoint.json"))
    }

    /// Load the persisted checkpoint for a dataset
    ///
    /// A missing or malformed checkpoint file means "no checkpoint": the
    /// dataset starts from line 0. Never fatal.
    pub fn load(&self, dataset: Dataset) -> Option<Checkpoint> {
        let path = self.path(dataset);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(dataset = %dataset, path = %path.display(), error = %e, "No checkpoint file");
                return None;
            },
        };

        match serde_json::from_str::<Checkpoint>(&contents) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!(
                    dataset = %dataset,
                    path = %path.display(),
                    error = %e,
                    "Malformed checkpoint file, starting from line 0"
                );
                None
            },
        }
    }

    /// Save if the save interval has elapsed; returns whether a save happened
    pub fn maybe_save(&mut self, dataset: Dataset, line: u64) -> std::io::Result<bool> {
        let due = match self.last_save {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        };
        if !due {
            return Ok(false);
        }
        self.save(dataset, line)?;
        Ok(true)
    }

    /// Unconditional save, called on completion and graceful cancellation
    pub fn finalize(&mut self, dataset: Dataset, line: u64) -> std::io::Result<()> {
        self.save(dataset, line)
    }

    fn save(&mut self, dataset: Dataset, line: u64) -> std::io::Result<()> {
        // Monotonic within a dataset run: never step backwards.
        let line = line.max(self.last_line);

        let checkpoint = Checkpoint {
            dataset: dataset.as_str().to_string(),
            last_processed_line: line,
            saved_at: Utc::now(),
        };

        std::fs::create_dir_all(&self.dir)?;

        let path = self.path(dataset);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&checkpoint)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        self.last_save = Some(Instant::now());
        self.last_line = line;
        debug!(dataset = %dataset, line, "Checkpoint saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manager(dir: &Path) -> CheckpointManager {
        CheckpointManager::new(dir, Duration::from_secs(5))
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());

        mgr.finalize(Dataset::Courts, 1500).unwrap();

        let loaded = mgr.load(Dataset::Courts).unwrap();
        assert_eq!(loaded.dataset, "courts");
        assert_eq!(loaded.last_processed_line, 1500);
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(manager(dir.path()).load(Dataset::Judges).is_none());
    }

    #[test]
    fn test_malformed_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(mgr.path(Dataset::Courts), "{ not json").unwrap();

        assert!(mgr.load(Dataset::Courts).is_none());
    }

    #[test]
    fn test_datasets_do_not_share_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.finalize(Dataset::Courts, 10).unwrap();

        assert!(mgr.load(Dataset::Judges).is_none());
        assert_eq!(mgr.load(Dataset::Courts).unwrap().last_processed_line, 10);
    }

    #[test]
    fn test_first_maybe_save_persists_then_respects_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = CheckpointManager::new(dir.path(), Duration::from_secs(3600));

        assert!(mgr.maybe_save(Dataset::Courts, 1).unwrap());
        // Interval has not elapsed: no save, file still holds line 1
        assert!(!mgr.maybe_save(Dataset::Courts, 2).unwrap());
        assert_eq!(mgr.load(Dataset::Courts).unwrap().last_processed_line, 1);
    }

    #[test]
    fn test_zero_interval_saves_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = CheckpointManager::new(dir.path(), Duration::ZERO);

        assert!(mgr.maybe_save(Dataset::Courts, 1).unwrap());
        assert!(mgr.maybe_save(Dataset::Courts, 2).unwrap());
        assert_eq!(mgr.load(Dataset::Courts).unwrap().last_processed_line, 2);
    }

    #[test]
    fn test_last_processed_line_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = CheckpointManager::new(dir.path(), Duration::ZERO);

        mgr.maybe_save(Dataset::Courts, 100).unwrap();
        // A lower offset never overwrites a higher one
        mgr.finalize(Dataset::Courts, 40).unwrap();
        assert_eq!(mgr.load(Dataset::Courts).unwrap().last_processed_line, 100);
    }

    #[test]
    fn test_saved_at_is_iso8601() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.finalize(Dataset::Judges, 7).unwrap();

        let raw = std::fs::read_to_string(mgr.path(Dataset::Judges)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let saved_at = value["saved_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(saved_at).is_ok());
    }
}
