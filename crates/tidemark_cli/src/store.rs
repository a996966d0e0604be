//! State persistence.
//!
//! The library never touches storage; the CLI keeps one JSON blob per state
//! file. Writes go to a sibling temp file that is then renamed over the
//! target, so a crash mid-write leaves the previous state intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tidemark::PersistedState;

/// Errors that can occur loading or saving state.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Reading or writing the state file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The state file is not a valid state blob.
    #[error("Invalid state in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StateStoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Loads and saves the state blob for one stream.
pub trait StateStore {
    /// Load the blob. A store that has never been written yields empty state.
    fn load(&self) -> Result<PersistedState, StateStoreError>;

    /// Replace the stored blob.
    fn save(&self, state: &PersistedState) -> Result<(), StateStoreError>;
}

/// State stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<PersistedState, StateStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state file, starting empty");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(StateStoreError::io(&self.path, e)),
        };

        PersistedState::from_json(&contents).map_err(|e| StateStoreError::json(&self.path, e))
    }

    fn save(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StateStoreError::io(parent, e))?;
        }

        let json = state
            .to_json()
            .map_err(|e| StateStoreError::json(&self.path, e))?;
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| StateStoreError::io(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| StateStoreError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "Saved state");
        Ok(())
    }
}
