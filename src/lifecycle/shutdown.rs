//! Shutdown coordination for the daemon.
//!
//! # Responsibilities
//! - Hold the single live binding
//! - Latch the stop request for the event loop
//! - Run the destroy-then-stop sequence
//!
//! # Design Decisions
//! - The binding is always dropped before the latch is tripped, so its
//!   teardown runs while the execution context is still serving
//! - The latch is a watch channel: subscribers created after the trip
//!   still observe it

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::binding::MctpBinding;
use crate::lifecycle::state::{LifecycleState, StateTracker};

/// Coordinator for shutdown.
///
/// Cloned into every task that needs to observe or request the stop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Returns `false` if it was already tripped.
    pub fn trigger(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered.
    pub async fn recv(&mut self) {
        // A dropped coordinator can never trigger; treat it as a stop.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Slot holding the process's single live binding.
#[derive(Clone, Default)]
pub struct BindingSlot {
    inner: Arc<Mutex<Option<Box<dyn MctpBinding>>>>,
}

impl BindingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `binding` the live binding.
    pub fn install(&self, binding: Box<dyn MctpBinding>) {
        let previous = self.lock().replace(binding);
        if previous.is_some() {
            tracing::warn!("Replacing a live binding");
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    /// Destroy the live binding. Returns whether one was present.
    pub fn reset(&self) -> bool {
        // Drop outside the lock so binding teardown cannot deadlock on it.
        let binding = self.lock().take();
        match binding {
            Some(binding) => {
                let kind = binding.kind();
                drop(binding);
                tracing::info!(binding = %kind, "Binding destroyed");
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn MctpBinding>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for BindingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingSlot")
            .field("occupied", &self.is_occupied())
            .finish()
    }
}

/// Runs the termination sequence: destroy the binding, then stop.
#[derive(Debug, Clone)]
pub struct Terminator {
    handle: Handle,
    binding: BindingSlot,
    shutdown: Shutdown,
    state: StateTracker,
}

impl Terminator {
    pub(crate) fn new(
        handle: Handle,
        binding: BindingSlot,
        shutdown: Shutdown,
        state: StateTracker,
    ) -> Self {
        Self {
            handle,
            binding,
            shutdown,
            state,
        }
    }

    /// Schedule the termination sequence on the execution context.
    pub fn request(&self) {
        let terminator = self.clone();
        self.handle.spawn(async move {
            terminator.terminate();
        });
    }

    /// Destroy the binding, then trip the shutdown latch.
    pub(crate) fn terminate(&self) {
        if self.shutdown.is_triggered() {
            return;
        }
        self.state.set(LifecycleState::ShuttingDown);
        self.binding.reset();
        self.shutdown.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::InitError;
    use crate::config::BindingKind;
    use std::sync::Mutex as StdMutex;

    struct Probe {
        log: Arc<StdMutex<Vec<&'static str>>>,
    }

    impl MctpBinding for Probe {
        fn kind(&self) -> BindingKind {
            BindingKind::Smbus
        }

        fn service_name(&self) -> Option<&str> {
            None
        }

        fn set_service_name(&mut self, _name: String) {}

        fn initialize(&mut self) -> Result<(), InitError> {
            Ok(())
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("binding dropped");
        }
    }

    #[tokio::test]
    async fn test_shutdown_latch() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());

        // Subscribing after the trip still observes it.
        let mut late = shutdown.subscribe();
        tokio::time::timeout(std::time::Duration::from_secs(1), late.recv())
            .await
            .expect("late subscriber must see the trip");
    }

    #[tokio::test]
    async fn test_binding_destroyed_before_stop() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let slot = BindingSlot::new();
        slot.install(Box::new(Probe { log: log.clone() }));
        assert!(slot.is_occupied());

        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let observer_log = log.clone();
        let observer = tokio::spawn(async move {
            signal.recv().await;
            observer_log.lock().unwrap().push("stopped");
        });

        let state = StateTracker::new();
        let terminator =
            Terminator::new(Handle::current(), slot.clone(), shutdown.clone(), state.clone());
        terminator.request();
        observer.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["binding dropped", "stopped"]);
        assert!(!slot.is_occupied());
        assert_eq!(state.get(), LifecycleState::ShuttingDown);

        // A second request is a no-op.
        terminator.terminate();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_reset_empty_slot() {
        let slot = BindingSlot::new();
        assert!(!slot.reset());
        assert!(!slot.is_occupied());
    }
}
