//! Logs directory helpers shared by the recorder and the exporter

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tl_core::time;

use crate::error::{Result, StoreError};

/// Prefix of every file written into the logs directory
pub const FILE_PREFIX: &str = "adapter_tty_";

/// Extension of every file written into the logs directory
pub const FILE_EXTENSION: &str = "log";

const RULE_WIDTH: usize = 60;

/// A file in the logs directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLog {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Saved logs, newest first
pub fn list_logs(dir: &Path) -> Result<Vec<SavedLog>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir)(e)),
    };

    let mut logs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(StoreError::io(dir))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
            continue;
        }

        let metadata = entry.metadata().map_err(StoreError::io(&path))?;
        if !metadata.is_file() {
            continue;
        }

        logs.push(SavedLog {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
        });
    }

    // Same-second files differ only by suffix; longer suffix is newer
    logs.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.name.len().cmp(&a.name.len()))
            .then_with(|| b.name.cmp(&a.name))
    });
    Ok(logs)
}

/// Delete the oldest logs so a new file keeps the total at `max_files`
///
/// Returns the number of files deleted.
pub fn make_room(dir: &Path, max_files: usize) -> Result<usize> {
    let logs = list_logs(dir)?;
    let keep = max_files.saturating_sub(1);
    if logs.len() <= keep {
        return Ok(0);
    }

    let mut deleted = 0;
    // Newest first, so everything past `keep` is older
    for log in &logs[keep..] {
        match fs::remove_file(&log.path) {
            Ok(()) => {
                tracing::debug!("Deleted old log {}", log.name);
                deleted += 1;
            }
            Err(e) => tracing::warn!("Failed to delete old log {}: {}", log.name, e),
        }
    }
    Ok(deleted)
}

/// A path for a new log stamped with `millis` that does not exist yet
///
/// Same-second names get a numeric suffix: `adapter_tty_143005_07MAR25_1.log`.
pub fn new_log_path(dir: &Path, millis: u64) -> PathBuf {
    let stem = format!("{}{}", FILE_PREFIX, time::file_stamp(millis));
    let mut path = dir.join(format!("{}.{}", stem, FILE_EXTENSION));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.{}", stem, suffix, FILE_EXTENSION));
        suffix += 1;
    }
    path
}

/// Resolve a saved log name to a path inside `dir`
///
/// Rejects anything that is not a plain file name.
pub fn resolve_name(dir: &Path, name: &str) -> Result<PathBuf> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().map(|n| n == name).unwrap_or(false);

    if !plain {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(dir.join(name))
}

/// The ruled block at the top of every log file
pub fn header(title: &str, label: &str, millis: u64) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\n{title}\n{label}: {}\n{rule}\n\n",
        time::format_datetime(millis)
    )
}
