//! Store error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from buffering, recording and exporting logs
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid log name: {0:?}")]
    InvalidName(String),

    #[error("Saved log not found: {0}")]
    NotFound(String),

    #[error("Recorder is not running")]
    NotRecording,
}

impl StoreError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
