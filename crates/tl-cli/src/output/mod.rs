//! Output formatting utilities for the CLI
//!
//! Coloured status messages and the saved-logs table. While streaming,
//! stdout carries only log lines, so everything else goes to stderr there.

use std::io::Write;
use std::time::SystemTime;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tabled::{settings::Style, Table, Tabled};

use tl_core::time;
use tl_core::ConnectionState;
use tl_store::SavedLog;

fn print_marked<W: Write>(mut out: W, color: Color, mark: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(mark),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    print_marked(std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Print an error message in red to stderr
pub fn print_error(msg: &str) {
    print_marked(std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Print a warning message in yellow to stderr
pub fn print_warning(msg: &str) {
    print_marked(std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    print_marked(std::io::stdout(), Color::Cyan, "ℹ ", msg);
}

/// Print an informational message to stderr, for use while streaming
pub fn print_status(msg: &str) {
    print_marked(std::io::stderr(), Color::Cyan, "ℹ ", msg);
}

/// Print a connection state change to stderr
pub fn print_state(state: &ConnectionState) {
    let (color, mark) = match state {
        ConnectionState::Connected => (Color::Green, "● "),
        ConnectionState::Connecting { .. } | ConnectionState::Reconnecting { .. } => {
            (Color::Yellow, "◌ ")
        }
        ConnectionState::Disconnected => (Color::DarkGrey, "○ "),
        ConnectionState::Error { .. } => (Color::Red, "✗ "),
    };
    print_marked(std::io::stderr(), color, mark, &state.to_string());
}

/// Format saved logs as a table, newest first as given
pub fn format_saved_logs(logs: &[SavedLog]) -> String {
    if logs.is_empty() {
        return "No saved logs".to_string();
    }

    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "SIZE")]
        size: String,
        #[tabled(rename = "MODIFIED")]
        modified: String,
    }

    let rows: Vec<LogRow> = logs
        .iter()
        .map(|log| LogRow {
            name: log.name.clone(),
            size: format_size(log.size),
            modified: format_modified(log.modified),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;

    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    }
}

fn format_modified(modified: SystemTime) -> String {
    modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| time::format_datetime(d.as_millis() as u64))
        .unwrap_or_else(|_| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MiB");
    }

    #[test]
    fn test_format_saved_logs() {
        assert_eq!(format_saved_logs(&[]), "No saved logs");

        let logs = vec![SavedLog {
            name: "adapter_tty_120000_01JAN25.log".to_string(),
            path: PathBuf::from("/tmp/adapter_tty_120000_01JAN25.log"),
            size: 2048,
            modified: SystemTime::now(),
        }];
        let table = format_saved_logs(&logs);
        assert!(table.contains("NAME"));
        assert!(table.contains("adapter_tty_120000_01JAN25.log"));
        assert!(table.contains("2.0 KiB"));
    }
}
