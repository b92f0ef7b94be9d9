//! State manager implementation
//!
//! Provides file-based state persistence with atomic writes. A sync run
//! loads the prior snapshot once, and writes back the new state it was
//! handed. At most one writer per state file is assumed.

use super::types::State;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Loads and persists [`State`] snapshots
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Path to the state file
    path: PathBuf,
}

impl StateManager {
    /// Create a new state manager with the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the persisted state, or an empty one if no file exists yet
    pub async fn load(&self) -> Result<State> {
        if !self.path.exists() {
            return Ok(State::new());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;

        serde_json::from_str(&contents).map_err(|e| Error::State {
            message: format!("Failed to parse state file: {e}"),
        })
    }

    /// Persist a state snapshot
    ///
    /// Writes to a temp file and renames it into place, so a crash mid-write
    /// never leaves a truncated snapshot behind.
    pub async fn save(&self, state: &State) -> Result<()> {
        let contents = serde_json::to_string_pretty(state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })?;

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        Ok(())
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
