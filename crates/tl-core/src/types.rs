//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time;

/// Lifecycle of the connection to the target device
///
/// Exactly one value is current at any time. Only the streamer's retry loop
/// writes it; everything else reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session, no retry activity
    #[default]
    Disconnected,
    /// First-time connect in progress
    Connecting { attempt: u32, max_attempts: u32 },
    /// Session and exec channel are live, lines are flowing
    Connected,
    /// Retrying after the stream dropped
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// Attempts exhausted; stays here until the next explicit connect
    Error { message: String },
}

impl ConnectionState {
    /// Session is live and the reader is running
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// A retry loop is running (connecting, connected or reconnecting)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting { .. }
                | ConnectionState::Connected
                | ConnectionState::Reconnecting { .. }
        )
    }

    /// Attempts were exhausted
    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionState::Error { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting {
                attempt,
                max_attempts,
            } => write!(f, "Connecting ({}/{})", attempt, max_attempts),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Reconnecting {
                attempt,
                max_attempts,
            } => write!(f, "Reconnecting ({}/{})", attempt, max_attempts),
            ConnectionState::Error { message } => write!(f, "Error: {}", message),
        }
    }
}

/// A single line read from the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Sequence id, strictly increasing in production order
    pub seq: u64,
    /// Arrival time (Unix milliseconds)
    pub timestamp_ms: u64,
    /// Decoded line text without the line terminator
    pub text: String,
}

impl LogLine {
    /// Create a line stamped with the current time
    pub fn new(seq: u64, text: impl Into<String>) -> Self {
        Self {
            seq,
            timestamp_ms: time::current_time_millis(),
            text: text.into(),
        }
    }

    /// Arrival time as local `HH:MM:SS.mmm`
    pub fn formatted_time(&self) -> String {
        time::format_clock(self.timestamp_ms)
    }

    /// `[HH:MM:SS.mmm] text`, the format used for files and exports
    pub fn to_export_line(&self) -> String {
        format!("[{}] {}", self.formatted_time(), self.text)
    }
}
