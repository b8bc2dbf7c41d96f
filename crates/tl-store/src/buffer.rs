//! In-memory line history
//!
//! A ring buffer of the most recent lines. When full, the oldest line is
//! dropped to make room.

use std::collections::VecDeque;

use tl_core::config::BufferConfig;
use tl_core::LogLine;

/// Bounded history of recent lines
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    capacity: usize,
    next_seq: u64,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` lines (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_seq: 1,
        }
    }

    /// Create a buffer from configuration
    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Add a line, removing the oldest if at capacity
    pub fn push(&mut self, line: LogLine) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.next_seq = self.next_seq.max(line.seq.saturating_add(1));
        self.lines.push_back(line);
    }

    /// Add raw text stamped now, with the buffer's next id
    pub fn push_line(&mut self, text: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.push(LogLine::new(seq, text));
        seq
    }

    /// Remove every line. Ids keep counting up.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Copy of the buffered lines, oldest first
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lines.iter().cloned().collect()
    }

    /// Iterate over the buffered lines, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All lines as `[HH:MM:SS.mmm] text`, newline separated
    pub fn export_text(&self) -> String {
        self.lines
            .iter()
            .map(LogLine::to_export_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::from_config(&BufferConfig::default())
    }
}
