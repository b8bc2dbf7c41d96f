//! Log streamer
//!
//! [`LogStreamer`] is the public handle. `connect()` spawns one background
//! task that owns the live session and runs the connect, read and reconnect
//! cycle; `disconnect()` cancels that task and waits for it to tear the
//! session down. The task is the only writer of the connection state.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tl_core::config::TargetConfig;
use tl_core::ConnectionState;

use crate::publisher::{LinePublisher, LineSubscription, DEFAULT_SUBSCRIBER_CAPACITY};
use crate::reader::{read_lines, LineSequence, ReadOutcome};
use crate::retry::{AttemptMode, RetryPolicy};
use crate::state::{StateCell, StateSubscription};
use crate::transport::{RemoteSession, SshTransport, Transport};

/// State shared between the handle and the background task
struct Shared {
    config: TargetConfig,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
    state: StateCell,
    lines: LinePublisher,
    sequence: LineSequence,
}

/// The running connect/read/reconnect task
struct ActiveLoop {
    /// Cancelled by `disconnect()`; doubles as the suppress-reconnect flag
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Control {
    active: Mutex<Option<ActiveLoop>>,
}

impl Drop for Control {
    fn drop(&mut self) {
        // Last handle gone: stop the background task
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

/// Streams the remote log with automatic reconnection
///
/// Cloning is cheap; all clones control the same connection.
#[derive(Clone)]
pub struct LogStreamer {
    shared: Arc<Shared>,
    control: Arc<Control>,
}

impl LogStreamer {
    /// Create a streamer that connects over SSH
    pub fn new(config: TargetConfig) -> Self {
        Self::with_transport(config, SshTransport::new())
    }

    /// Create a streamer using a custom transport
    pub fn with_transport<T: Transport>(config: TargetConfig, transport: T) -> Self {
        Self::with_line_capacity(config, transport, DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Create a streamer whose line subscribers buffer up to `capacity` lines
    pub fn with_line_capacity<T: Transport>(
        config: TargetConfig,
        transport: T,
        capacity: usize,
    ) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            shared: Arc::new(Shared {
                config,
                policy,
                transport: Arc::new(transport),
                state: StateCell::new(),
                lines: LinePublisher::with_capacity(capacity),
                sequence: LineSequence::new(),
            }),
            control: Arc::new(Control {
                active: Mutex::new(None),
            }),
        }
    }

    /// Start connecting.
    ///
    /// Does nothing while a cycle is already connecting, connected or
    /// reconnecting. From `Error` or `Disconnected` a fresh cycle starts at
    /// attempt 1.
    pub async fn connect(&self) {
        let mut active = self.control.active.lock().await;

        if let Some(current) = active.as_ref() {
            if !current.task.is_finished() && !self.shared.state.current().is_error() {
                tracing::debug!(
                    "connect() ignored, retry loop already running ({})",
                    self.shared.state.current()
                );
                return;
            }
        }

        if let Some(finished) = active.take() {
            // Already exhausted; reap it before starting over
            if let Err(e) = finished.task.await {
                tracing::error!("Retry loop ended abnormally: {}", e);
            }
        }

        tracing::info!(
            "Connecting to {}@{} (max {} attempts, {}ms interval)",
            self.shared.config.username,
            self.shared.config.address(),
            self.shared.policy.max_attempts(),
            self.shared.policy.interval().as_millis()
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(Arc::clone(&self.shared), cancel.clone()));
        *active = Some(ActiveLoop { cancel, task });
    }

    /// Stop streaming and suppress reconnection.
    ///
    /// Cancels any wait, connect or read in progress, waits for the session
    /// to be torn down and leaves the state at `Disconnected`. Calling it
    /// while already disconnected does nothing.
    pub async fn disconnect(&self) {
        let mut active = self.control.active.lock().await;

        if let Some(current) = active.take() {
            tracing::debug!(
                "disconnect() called (manual, {} state subscribers)",
                self.shared.state.subscriber_count()
            );
            current.cancel.cancel();
            if let Err(e) = current.task.await {
                tracing::error!("Retry loop ended abnormally: {}", e);
            }
        }

        if self.shared.state.publish_if_changed(ConnectionState::Disconnected) {
            tracing::info!("Disconnected from {}", self.shared.config.address());
        }
    }

    /// The current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state.current()
    }

    /// Subscribe to state transitions, starting with the current state
    pub fn subscribe_state(&self) -> StateSubscription {
        self.shared.state.subscribe()
    }

    /// Subscribe to lines read from now on
    pub fn subscribe_lines(&self) -> LineSubscription {
        self.shared.lines.subscribe()
    }

    /// The target configuration
    pub fn config(&self) -> &TargetConfig {
        &self.shared.config
    }

    /// Sequence id of the most recent line (0 before the first)
    pub fn last_sequence_id(&self) -> u64 {
        self.shared.sequence.last_id()
    }
}

/// Connect, read until the stream ends, then reconnect; until cancelled or
/// attempts run out
async fn run(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut mode = AttemptMode::Initial;

    loop {
        let Some(mut session) = connect_with_retry(&shared, mode, &cancel).await else {
            return;
        };

        if cancel.is_cancelled() {
            session.close().await;
            return;
        }

        shared.state.publish(ConnectionState::Connected);
        tracing::info!(
            "Connection established to {} ({} line subscribers)",
            shared.config.address(),
            shared.lines.subscriber_count()
        );

        let outcome = read_lines(session.as_mut(), &shared.lines, &shared.sequence, &cancel).await;
        session.close().await;

        match &outcome {
            ReadOutcome::Cancelled => return,
            ReadOutcome::EndOfStream => tracing::warn!("Log stream ended"),
            ReadOutcome::ReadError { cause } => tracing::warn!("Log stream failed: {}", cause),
        }

        // A disconnect may have raced with the drop
        if cancel.is_cancelled() {
            return;
        }

        tracing::info!(
            "Waiting {}ms before reconnecting",
            shared.policy.interval().as_millis()
        );
        if !shared.policy.pause(&cancel).await {
            return;
        }
        mode = AttemptMode::Reconnect;
    }
}

/// Run one cycle of attempts.
///
/// Returns the session on success, or `None` when cancelled or when every
/// attempt failed (after publishing `Error`).
async fn connect_with_retry(
    shared: &Shared,
    mode: AttemptMode,
    cancel: &CancellationToken,
) -> Option<Box<dyn RemoteSession>> {
    let max_attempts = shared.policy.max_attempts();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return None;
        }

        shared.state.publish(mode.state(attempt, max_attempts));
        tracing::debug!(
            "Connection attempt {}/{} ({:?})",
            attempt,
            max_attempts,
            mode
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = shared.transport.open(&shared.config) => result,
        };

        match result {
            Ok(session) => return Some(session),
            Err(e) => {
                tracing::warn!("Connection attempt {} failed: {}", attempt, e);

                if shared.policy.is_exhausted(attempt) {
                    let message = shared.policy.exhausted_message(&e);
                    tracing::error!("{}", message);
                    if !cancel.is_cancelled() {
                        shared.state.publish(ConnectionState::Error { message });
                    }
                    return None;
                }

                if !shared.policy.pause(cancel).await {
                    return None;
                }
            }
        }
    }

    None
}
