//! tl-store: Keeping what the device printed
//!
//! - [`LogBuffer`]: bounded in-memory history of recent lines
//! - [`LogRecorder`]: continuous recording into size-rotated files
//! - [`LogExporter`]: one-off snapshots of the buffer and saved-log management
//!
//! Recordings and snapshots share one logs directory and one file count
//! limit.

pub mod buffer;
pub mod error;
pub mod exporter;
pub mod files;
pub mod recorder;

pub use buffer::LogBuffer;
pub use error::StoreError;
pub use exporter::LogExporter;
pub use files::SavedLog;
pub use recorder::LogRecorder;
