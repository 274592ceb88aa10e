//! Flat-file backend: one JSON document holding the whole collection.
//!
//! Reads load the file in full; writes serialize the full collection to a
//! sibling temp file and rename it into place, so a failed write never leaves
//! a half-written document behind. Acceptable only at personal-tracker scale.

use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::obligation::Obligation;
use crate::store::StoreBackend;

/// JSON flat-file backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Create a backend over the given file path. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StoreBackend for FileBackend {
    fn load_all(&self) -> StoreResult<Vec<Obligation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_str(&contents).map_err(|e| StoreError::Serialization {
            message: format!("{}: {e}", self.path.display()),
        })
    }

    fn save_all(&mut self, obligations: &[Obligation]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json =
            serde_json::to_string_pretty(obligations).map_err(|e| StoreError::Serialization {
                message: e.to_string(),
            })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), count = obligations.len(), "collection persisted");
        Ok(())
    }
}
