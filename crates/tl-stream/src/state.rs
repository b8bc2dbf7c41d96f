//! Connection state cell
//!
//! Holds the current [`ConnectionState`] and fans every transition out to
//! subscribers. Unlike a `watch` channel, nothing is coalesced: each
//! subscriber sees the value current when it subscribed, then every later
//! transition in order.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;

use tl_core::ConnectionState;

struct Inner {
    current: ConnectionState,
    subscribers: Vec<mpsc::UnboundedSender<ConnectionState>>,
}

/// Current connection state with ordered, replaying subscriptions
pub struct StateCell {
    inner: Mutex<Inner>,
}

impl StateCell {
    /// Create a cell holding `Disconnected`
    pub fn new() -> Self {
        Self::with_state(ConnectionState::Disconnected)
    }

    /// Create a cell holding `initial`
    pub fn with_state(initial: ConnectionState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded data is always left consistent, so a poisoned lock is usable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The latest state
    pub fn current(&self) -> ConnectionState {
        self.lock().current.clone()
    }

    /// Subscribe to transitions, starting with the current state
    pub fn subscribe(&self) -> StateSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // Cannot fail: the receiver is still held here
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        StateSubscription { rx }
    }

    /// Publish a transition
    pub(crate) fn publish(&self, state: ConnectionState) {
        Self::publish_locked(&mut self.lock(), state);
    }

    /// Publish only if `state` differs from the current value.
    ///
    /// Returns whether a transition was published.
    pub(crate) fn publish_if_changed(&self, state: ConnectionState) -> bool {
        let mut inner = self.lock();
        if inner.current == state {
            return false;
        }
        Self::publish_locked(&mut inner, state);
        true
    }

    fn publish_locked(inner: &mut Inner, state: ConnectionState) {
        tracing::debug!("Connection state: {} -> {}", inner.current, state);
        inner.current = state.clone();
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(state.clone()).is_ok());
    }

    /// Number of live subscriptions
    pub(crate) fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|s| !s.is_closed());
        inner.subscribers.len()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives connection state transitions in order
#[derive(Debug)]
pub struct StateSubscription {
    rx: mpsc::UnboundedReceiver<ConnectionState>,
}

impl StateSubscription {
    /// Wait for the next state. Returns `None` once the streamer is gone.
    pub async fn recv(&mut self) -> Option<ConnectionState> {
        self.rx.recv().await
    }

    /// Take the next state if one is already queued
    pub fn try_recv(&mut self) -> Option<ConnectionState> {
        self.rx.try_recv().ok()
    }

    /// Wait until a state matching `predicate` arrives and return it
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<ConnectionState>
    where
        F: FnMut(&ConnectionState) -> bool,
    {
        while let Some(state) = self.recv().await {
            if predicate(&state) {
                return Some(state);
            }
        }
        None
    }
}
