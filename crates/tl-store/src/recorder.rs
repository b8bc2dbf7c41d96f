//! Continuous recording into size-rotated files
//!
//! A recording writes every line to `adapter_tty_<stamp>.log` in the logs
//! directory. Once the next line would push the file past the size limit,
//! the file is closed and a fresh one (with its own header) takes over.
//! Before any file is created the oldest logs are removed so the directory
//! never holds more than the configured number of files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tl_core::config::RecorderConfig;
use tl_core::time::current_time_millis;
use tl_core::LogLine;

use crate::error::{Result, StoreError};
use crate::files;

/// Buffered bytes are flushed to disk at least this often
pub const FLUSH_INTERVAL_BYTES: u64 = 100 * 1024;

const HEADER_TITLE: &str = "Adapter TTY Log";

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
    size: u64,
    unflushed: u64,
}

impl OpenFile {
    fn create(dir: &Path) -> Result<Self> {
        let now = current_time_millis();
        let path = files::new_log_path(dir, now);
        let file = File::create(&path).map_err(StoreError::io(&path))?;

        let mut open = Self {
            path,
            writer: BufWriter::new(file),
            size: 0,
            unflushed: 0,
        };
        open.write(files::header(HEADER_TITLE, "Started", now).as_bytes())?;
        open.flush()?;
        Ok(open)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(StoreError::io(&self.path))?;
        self.size += bytes.len() as u64;
        self.unflushed += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(StoreError::io(&self.path))?;
        self.unflushed = 0;
        Ok(())
    }
}

/// Writes the live stream to rotating files
pub struct LogRecorder {
    config: RecorderConfig,
    current: Option<OpenFile>,
}

impl LogRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Begin recording into a new file and return its path
    ///
    /// Returns the current file if a recording is already running.
    pub fn start(&mut self) -> Result<PathBuf> {
        if let Some(open) = &self.current {
            return Ok(open.path.clone());
        }

        let open = self.open_next()?;
        let path = open.path.clone();
        tracing::info!("Recording to {}", path.display());
        self.current = Some(open);
        Ok(path)
    }

    /// Append one line as `[HH:MM:SS.mmm] text`
    pub fn write_line(&mut self, line: &LogLine) -> Result<()> {
        let mut formatted = line.to_export_line();
        formatted.push('\n');
        let len = formatted.len() as u64;

        let needs_rotation = match &self.current {
            Some(open) => open.size + len > self.config.max_file_bytes,
            None => return Err(StoreError::NotRecording),
        };
        if needs_rotation {
            self.rotate()?;
        }

        let open = self.current.as_mut().ok_or(StoreError::NotRecording)?;
        open.write(formatted.as_bytes())?;
        if open.unflushed >= FLUSH_INTERVAL_BYTES {
            open.flush()?;
        }
        Ok(())
    }

    /// Flush and close the recording, returning the last file written
    pub fn stop(&mut self) -> Result<Option<PathBuf>> {
        let Some(mut open) = self.current.take() else {
            return Ok(None);
        };
        open.flush()?;
        tracing::info!(
            "Stopped recording {} ({} KiB)",
            open.path.display(),
            open.size / 1024
        );
        Ok(Some(open.path))
    }

    pub fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    /// Size of the file currently being written, header included
    pub fn current_size(&self) -> u64 {
        self.current.as_ref().map(|open| open.size).unwrap_or(0)
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut finished) = self.current.take() {
            tracing::debug!(
                "Size limit reached ({} KiB), rotating {}",
                finished.size / 1024,
                finished.path.display()
            );
            finished.flush()?;
        }
        let next = self.open_next()?;
        tracing::debug!("Rotated to {}", next.path.display());
        self.current = Some(next);
        Ok(())
    }

    fn open_next(&self) -> Result<OpenFile> {
        let dir = &self.config.logs_dir;
        fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        files::make_room(dir, self.config.max_files)?;
        OpenFile::create(dir)
    }
}

impl Drop for LogRecorder {
    fn drop(&mut self) {
        if let Some(open) = self.current.as_mut() {
            if let Err(e) = open.flush() {
                tracing::warn!("Failed to flush recording on drop: {}", e);
            }
        }
    }
}
