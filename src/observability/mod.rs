//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → stdout, collected by the process supervisor
//! ```
//!
//! # Design Decisions
//! - Structured fields (service, binding, path) on every lifecycle event
//! - Startup failures log the cause at warn, then the verdict at error

pub mod logging;
