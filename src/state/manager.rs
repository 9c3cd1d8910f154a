//! State manager implementation
//!
//! Provides file-based state persistence with atomic writes.

use super::types::RunState;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads and saves [`RunState`] at a fixed path
#[derive(Debug, Clone)]
pub struct StateManager {
    path: PathBuf,
}

impl StateManager {
    /// Create a new state manager with the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous run's state, `None` if there is none yet
    pub async fn load(&self) -> Result<Option<RunState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;

        let state = serde_json::from_str(&contents)
            .map_err(|e| Error::state(format!("Failed to parse state file: {e}")))?;

        Ok(Some(state))
    }

    /// Write `state`, replacing the previous file atomically
    pub async fn save(&self, state: &RunState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::state(format!("Failed to create state directory: {e}")))?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!(path = %self.path.display(), objects = state.object_counts.len(), "Saved run state");
        Ok(())
    }
}
