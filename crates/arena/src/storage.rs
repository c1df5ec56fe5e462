//! Durable, resumable storage for match results.
//!
//! The whole result list is written as one versioned JSON snapshot after every
//! finished match. Writes go to a temporary file that is then renamed over the
//! snapshot, so a crash never leaves a half-written file behind. Each match also
//! gets its own PGN file under `<output_dir>/pgn/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::game_runner::{MatchResult, Outcome};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from reading or writing the snapshot.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot is not valid JSON or does not match the schema.
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported snapshot version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("Snapshot contains match {0} more than once")]
    DuplicateMatch(u32),
    #[error("Snapshot record for match {match_id} is inconsistent: {reason}")]
    InconsistentRecord { match_id: u32, reason: &'static str },
}

/// On-disk snapshot layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub results: Vec<MatchResult>,
}

impl Snapshot {
    pub fn new(results: Vec<MatchResult>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            last_updated: Utc::now(),
            results,
        }
    }

    /// Checks the version, match id uniqueness and that every record agrees
    /// with itself.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: self.version,
            });
        }
        let mut seen = HashSet::new();
        for result in &self.results {
            if !seen.insert(result.match_id) {
                return Err(StorageError::DuplicateMatch(result.match_id));
            }
            check_record(result)?;
        }
        Ok(())
    }
}

/// An error is present exactly for aborted matches and the move count matches
/// the recorded moves.
fn check_record(result: &MatchResult) -> Result<(), StorageError> {
    let reason = if result.error.is_some() != (result.outcome == Outcome::Aborted) {
        "error must be set exactly for aborted matches"
    } else if result.move_count != result.moves.len() {
        "move_count does not match moves"
    } else {
        return Ok(());
    };
    Err(StorageError::InconsistentRecord {
        match_id: result.match_id,
        reason,
    })
}

/// Reads and validates a snapshot. A missing file is an empty result list.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a valid snapshot, has
/// an unsupported version or repeats a match id.
pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<MatchResult>, StorageError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;
    snapshot.validate()?;
    Ok(snapshot.results)
}

/// Snapshot file plus per-match PGN directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    results_file: PathBuf,
    pgn_dir: PathBuf,
}

impl ResultStore {
    pub fn new(results_file: impl Into<PathBuf>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            results_file: results_file.into(),
            pgn_dir: output_dir.as_ref().join("pgn"),
        }
    }

    pub fn results_file(&self) -> &Path {
        &self.results_file
    }

    /// Previously persisted results, empty when no snapshot exists.
    pub fn load(&self) -> Result<Vec<MatchResult>, StorageError> {
        load_results(&self.results_file)
    }

    /// Atomically replaces the snapshot with `results`.
    pub async fn save(&self, results: &[MatchResult]) -> Result<(), StorageError> {
        let snapshot = Snapshot::new(results.to_vec());
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.results_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.results_file.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.results_file).await?;
        debug!(results = results.len(), path = %self.results_file.display(), "Snapshot saved");
        Ok(())
    }

    /// Removes the snapshot so the next run starts from scratch.
    pub fn reset(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.results_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// `<output_dir>/pgn/match_NNNN.pgn`.
    pub fn pgn_path(&self, match_id: u32) -> PathBuf {
        self.pgn_dir.join(format!("match_{:04}.pgn", match_id))
    }

    /// Writes the PGN record of a finished match.
    pub async fn write_pgn(&self, result: &MatchResult) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.pgn_dir).await?;
        tokio::fs::write(self.pgn_path(result.match_id), result.pgn.as_bytes()).await?;
        Ok(())
    }
}
