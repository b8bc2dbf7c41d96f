//! Buffer and recorder configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of lines kept in memory
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

/// Default size at which a recording rotates to a new file
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of log files kept in the logs directory
pub const DEFAULT_MAX_FILES: usize = 20;

/// In-memory ring buffer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of lines kept; the oldest are dropped first
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Rotating file recorder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory holding recordings and exported snapshots
    pub logs_dir: PathBuf,

    /// Rotate once the current file would grow beyond this many bytes
    pub max_file_bytes: u64,

    /// Oldest files are deleted so that no more than this many remain
    pub max_files: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            logs_dir: super::default_logs_dir(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}
