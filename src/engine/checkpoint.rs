//! Persisted synchronization checkpoint
//!
//! One small JSON state file per index. The file records the last
//! transaction id known to be fully synchronized; a missing file reads as 0
//! (never synced). Writes go through a temp file and rename so a crashed
//! process never leaves a torn checkpoint behind.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointState {
    txid: u64,
    updated_at: DateTime<Utc>,
}

/// File-backed checkpoint for one index
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir` for the given index
    pub fn new(dir: &Path, index: &str) -> Self {
        Self {
            path: dir.join(format!(".{index}.checkpoint")),
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted checkpoint; 0 when the file does not exist
    pub fn load(&self) -> EngineResult<u64> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(EngineError::CheckpointLoad {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let state: CheckpointState =
            serde_json::from_str(&text).map_err(|e| EngineError::CheckpointLoad {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        Ok(state.txid)
    }

    /// Persist the checkpoint
    pub fn store(&self, txid: u64) -> EngineResult<()> {
        let state = CheckpointState {
            txid,
            updated_at: Utc::now(),
        };

        let store_err = |reason: String| EngineError::CheckpointStore {
            path: self.path.clone(),
            reason,
        };

        let payload = serde_json::to_vec_pretty(&state).map_err(|e| store_err(e.to_string()))?;

        let tmp = self.path.with_extension("checkpoint.tmp");
        fs::write(&tmp, payload).map_err(|e| store_err(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| store_err(e.to_string()))?;

        debug!(path = %self.path.display(), txid, "Checkpoint persisted");
        Ok(())
    }
}
