//! JSON file store for the history.
//!
//! The whole history lives in one file that is read, transformed and
//! replaced once per cycle.

use crate::history::{HistoryStore, ValidationError};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid history: {0}")]
    Validation(#[from] ValidationError),
}

/// Handle on the history file.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the history. A missing file is an empty history.
    pub fn load(&self) -> Result<HistoryStore, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No history at {}, starting empty", self.path.display());
                return Ok(HistoryStore::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the history file.
    ///
    /// Writes a sibling temp file and renames it over the target so readers
    /// never see a partial write.
    pub fn save(&self, store: &HistoryStore) -> Result<(), StoreError> {
        let json = to_pretty_json(store)?;
        let tmp = self.tmp_path();

        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::warn!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(self.io_error(e));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Serialize with 4-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json output is always UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
