//! Buffer snapshots and saved-log management

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tl_core::config::RecorderConfig;
use tl_core::time::current_time_millis;

use crate::buffer::LogBuffer;
use crate::error::{Result, StoreError};
use crate::files::{self, SavedLog};

const HEADER_TITLE: &str = "Adapter TTY Log Export";

/// Saves buffer snapshots and manages the files in the logs directory
#[derive(Debug, Clone)]
pub struct LogExporter {
    logs_dir: PathBuf,
    max_files: usize,
}

impl LogExporter {
    pub fn new(logs_dir: impl Into<PathBuf>, max_files: usize) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            max_files,
        }
    }

    /// Create an exporter sharing the recorder's directory and file limit
    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::new(&config.logs_dir, config.max_files)
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Write the buffer to a new file in the logs directory
    pub fn save_snapshot(&self, buffer: &LogBuffer) -> Result<PathBuf> {
        fs::create_dir_all(&self.logs_dir).map_err(StoreError::io(&self.logs_dir))?;
        files::make_room(&self.logs_dir, self.max_files)?;

        let path = files::new_log_path(&self.logs_dir, current_time_millis());
        self.export_to(buffer, &path)?;
        tracing::info!(
            "Saved {} lines to {}",
            buffer.len(),
            path.display()
        );
        Ok(path)
    }

    /// Write the buffer to an arbitrary path, outside the file limit
    pub fn export_to(&self, buffer: &LogBuffer, path: &Path) -> Result<()> {
        let mut contents = files::header(HEADER_TITLE, "Exported", current_time_millis());
        contents.push_str(&buffer.export_text());
        fs::write(path, contents).map_err(StoreError::io(path))
    }

    /// Saved logs, newest first
    pub fn list(&self) -> Result<Vec<SavedLog>> {
        files::list_logs(&self.logs_dir)
    }

    /// Read a saved log by file name
    pub fn read(&self, name: &str) -> Result<String> {
        let path = files::resolve_name(&self.logs_dir, name)?;
        fs::read_to_string(&path).map_err(|e| not_found_or_io(name, &path, e))
    }

    /// Copy a saved log to `dest`, returning the bytes copied
    pub fn copy_to(&self, name: &str, dest: &Path) -> Result<u64> {
        let path = files::resolve_name(&self.logs_dir, name)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let copied = fs::copy(&path, dest).map_err(StoreError::io(dest))?;
        tracing::info!("Copied {} to {}", name, dest.display());
        Ok(copied)
    }

    /// Delete a saved log by file name
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = files::resolve_name(&self.logs_dir, name)?;
        fs::remove_file(&path).map_err(|e| not_found_or_io(name, &path, e))?;
        tracing::info!("Deleted saved log {}", name);
        Ok(())
    }
}

fn not_found_or_io(name: &str, path: &Path, e: io::Error) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(name.to_string())
    } else {
        StoreError::io(path)(e)
    }
}
