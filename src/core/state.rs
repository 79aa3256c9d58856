//! Publisher lifecycle state.
//!
//! The publisher moves `Idle -> Running -> Terminated` exactly once. The
//! current state is broadcast on a `watch` channel so a supervisor (or a
//! test) can wait for the loop to start or stop without polling.

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    /// Constructed, transport not connected yet.
    Idle,
    /// Transport connected, ticking.
    Running,
    /// Loop has stopped, whether cancelled or failed.
    Terminated,
}

impl PublisherState {
    pub fn is_running(&self) -> bool {
        matches!(self, PublisherState::Running)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, PublisherState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublisherState::Idle => "Idle",
            PublisherState::Running => "Running",
            PublisherState::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for PublisherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared lifecycle tracker.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state_tx: watch::Sender<PublisherState>,
    state_rx: watch::Receiver<PublisherState>,
}

impl Lifecycle {
    /// Starts in `Idle`.
    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(PublisherState::Idle);
        Self { state_tx, state_rx }
    }

    pub fn subscribe(&self) -> watch::Receiver<PublisherState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> PublisherState {
        *self.state_rx.borrow()
    }

    /// Moves to `state`. `Terminated` is final; later transitions are ignored.
    pub fn set_state(&self, state: PublisherState) {
        let old_state = self.current_state();
        if old_state.is_terminated() || old_state == state {
            return;
        }
        self.state_tx.send_replace(state);
        debug!("Publisher state changed: {} -> {}", old_state, state);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
