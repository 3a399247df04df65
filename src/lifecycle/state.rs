//! Process lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Starting → ConfigLoaded → BoundToBus → BindingConstructed
//!     → Initialized → Running → ShuttingDown → Stopped
//! ```
//!
//! Any failure before `Running` ends the process; there are no retries.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Starting,
    ConfigLoaded,
    BoundToBus,
    BindingConstructed,
    Initialized,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::ConfigLoaded => "config-loaded",
            LifecycleState::BoundToBus => "bound-to-bus",
            LifecycleState::BindingConstructed => "binding-constructed",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, observable lifecycle state.
#[derive(Debug, Clone)]
pub struct StateTracker {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Starting);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn set(&self, state: LifecycleState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Lifecycle transition");
        }
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_observable() {
        let tracker = StateTracker::new();
        let rx = tracker.subscribe();
        assert_eq!(tracker.get(), LifecycleState::Starting);

        tracker.clone().set(LifecycleState::ConfigLoaded);
        assert_eq!(*rx.borrow(), LifecycleState::ConfigLoaded);
        assert!(LifecycleState::Running < LifecycleState::ShuttingDown);
        assert_eq!(LifecycleState::BoundToBus.to_string(), "bound-to-bus");
    }
}
