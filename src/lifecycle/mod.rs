//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Runtime + signal watcher → Connection → Load config
//!         → Request service name → Object server → Build binding
//!         → Name + initialize binding → Run event loop
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Destroy binding → Stop event loop → Exit 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup; the first failure ends the process with status 255
//! - Ordered shutdown: the binding is gone before the loop stops
//! - One current-thread runtime; all binding access happens on it

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::{BindingSlot, Shutdown, Terminator};
pub use startup::{Daemon, DaemonError, Options, FAILURE_EXIT_CODE};
pub use state::LifecycleState;
