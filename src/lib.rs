//! MCTP daemon library.
//!
//! Exposes one physical MCTP binding (SMBus or PCIe) as a single service
//! on the service bus and coordinates its startup and shutdown.

// Core subsystems
pub mod binding;
pub mod bus;
pub mod config;
pub mod hw;

// Cross-cutting concerns
pub mod cli;
pub mod lifecycle;
pub mod observability;

pub use binding::{BindingFactory, MctpBinding};
pub use config::{Configuration, ConfigurationLoader};
pub use lifecycle::{Daemon, DaemonError, Options};
