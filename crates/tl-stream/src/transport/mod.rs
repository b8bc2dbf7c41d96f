//! Transport sessions to the target device
//!
//! A transport opens one remote-command session per connection attempt and
//! hands back its stdout as a byte source. The retry loop only sees the
//! traits in this module, so it can be driven by something other than SSH.

mod ssh;

pub use ssh::{SshSession, SshTransport};

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use tl_core::config::TargetConfig;

/// Failure of a single connection attempt
///
/// Attempt failures are recovered by the retry loop; callers only log them
/// and, once attempts are exhausted, show the last one.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// A connection step did not finish within the connect timeout
    #[error("{stage} timed out after {}ms", .after.as_millis())]
    Timeout {
        stage: &'static str,
        after: Duration,
    },

    /// TCP connect or SSH handshake failed
    #[error("Failed to connect to {address}: {source}")]
    Handshake {
        address: String,
        #[source]
        source: russh::Error,
    },

    /// The server refused the configured credential
    #[error("Authentication rejected for user '{username}'")]
    AuthRejected { username: String },

    /// The server key did not match the configured fingerprint
    #[error("Host key mismatch: expected {expected}, got {actual}")]
    HostKeyMismatch { expected: String, actual: String },

    /// Opening the exec channel or starting the remote command failed
    #[error("Failed to start '{command}': {source}")]
    Channel {
        command: String,
        #[source]
        source: russh::Error,
    },

    /// Any other SSH protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Failure while tearing a session down; logged, never propagated
#[derive(Debug, Error)]
pub enum TeardownError {
    /// The peer did not acknowledge in time
    #[error("{stage} timed out")]
    Timeout { stage: &'static str },

    /// SSH protocol error during teardown
    #[error("{stage} failed: {source}")]
    Ssh {
        stage: &'static str,
        #[source]
        source: russh::Error,
    },
}

/// A readable stream of bytes
#[async_trait]
pub trait ByteSource: Send {
    /// Read the next chunk of bytes.
    ///
    /// Returns `Ok(None)` at end of input. Must be cancel safe: dropping the
    /// returned future must not lose data that was already received.
    async fn read_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

/// A live session running the follow-file command
///
/// Owns the transport session and its exec channel together.
#[async_trait]
pub trait RemoteSession: ByteSource {
    /// Tear down the channel, then the session. Errors are logged only.
    async fn close(self: Box<Self>);
}

/// Opens sessions to the target device
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a session and start `tail -f` on the configured file
    async fn open(&self, config: &TargetConfig) -> Result<Box<dyn RemoteSession>, ConnectError>;
}
