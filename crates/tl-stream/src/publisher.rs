//! Line stream publisher
//!
//! Lossy broadcast from the line reader to any number of consumers. Each
//! subscriber has its own bounded queue; when a queue is full the incoming
//! line is dropped for that subscriber only, so a slow consumer never stalls
//! the reader or the other consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use tl_core::LogLine;

use crate::reader::LineSink;

/// Default per-subscriber queue capacity.
///
/// Absorbs bursts such as the backlog `tail -f` prints when it starts.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1000;

struct Subscriber {
    tx: mpsc::Sender<LogLine>,
    dropped: Arc<AtomicU64>,
}

/// Broadcasts lines to independent subscribers
pub struct LinePublisher {
    subscribers: Mutex<Vec<Subscriber>>,
    capacity: usize,
}

impl LinePublisher {
    /// Create a publisher with the default queue capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Create a publisher whose subscribers buffer up to `capacity` lines
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subscribe to lines published from now on
    pub fn subscribe(&self) -> LineSubscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        self.lock().push(Subscriber {
            tx,
            dropped: Arc::clone(&dropped),
        });
        LineSubscription { rx, dropped }
    }

    /// Deliver a line to every subscriber without waiting
    pub fn publish(&self, line: LogLine) {
        let mut subscribers = self.lock();
        subscribers.retain(|subscriber| match subscriber.tx.try_send(line.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(line)) => {
                let total = subscriber.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!("Subscriber queue full, dropped line #{} ({} total)", line.seq, total);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Number of live subscriptions
    pub(crate) fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }
}

impl Default for LinePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSink for LinePublisher {
    fn push(&self, line: LogLine) {
        self.publish(line);
    }
}

/// Receives lines from a [`LinePublisher`]
#[derive(Debug)]
pub struct LineSubscription {
    rx: mpsc::Receiver<LogLine>,
    dropped: Arc<AtomicU64>,
}

impl LineSubscription {
    /// Wait for the next line. Returns `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<LogLine> {
        self.rx.recv().await
    }

    /// Take the next line if one is queued
    pub fn try_recv(&mut self) -> Option<LogLine> {
        self.rx.try_recv().ok()
    }

    /// Lines dropped for this subscriber because its queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
