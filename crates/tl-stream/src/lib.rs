//! tl-stream: Resilient SSH log streaming
//!
//! Follows a file on a remote device with `tail -f` over SSH, splits the
//! output into lines and broadcasts them, reconnecting with a bounded
//! number of fixed-interval attempts whenever the stream drops.
//!
//! ```ignore
//! let streamer = LogStreamer::new(config.target);
//! let mut lines = streamer.subscribe_lines();
//! streamer.connect().await;
//! while let Some(line) = lines.recv().await {
//!     println!("{}", line.to_export_line());
//! }
//! ```

pub mod publisher;
pub mod reader;
pub mod retry;
pub mod state;
pub mod streamer;
pub mod transport;

pub use publisher::{LinePublisher, LineSubscription};
pub use reader::{LineSink, ReadOutcome};
pub use retry::{AttemptMode, RetryPolicy};
pub use state::{StateCell, StateSubscription};
pub use streamer::LogStreamer;
pub use transport::{ByteSource, ConnectError, RemoteSession, SshTransport, Transport};
