//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers on the execution context
//! - Run the termination sequence when either arrives
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Registered before any blocking startup step; a signal that arrives
//!   early is delivered once the event loop runs

use std::io;

use tokio::runtime::Handle;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Terminator;

/// Registered termination signal streams.
#[derive(Debug)]
pub struct TerminationSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl TerminationSignals {
    /// Register the handlers. Must be called within a runtime context.
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next termination signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Register the handlers and spawn the watcher that terminates the daemon.
pub fn watch(handle: &Handle, terminator: Terminator) -> io::Result<JoinHandle<()>> {
    let mut signals = {
        let _guard = handle.enter();
        TerminationSignals::register()?
    };
    tracing::debug!("Termination signal handlers registered");

    Ok(handle.spawn(async move {
        let name = signals.recv().await;
        tracing::info!(signal = name, "Termination signal received");
        terminator.terminate();
    }))
}
