//! Service bus subsystem.
//!
//! # Data Flow
//! ```text
//! Connection (bound to the execution context)
//!     → request_name("xyz.openbmc_project.<logical name>")
//!     → ObjectServer (object manager enabled)
//!         → bindings publish their objects under /xyz/openbmc_project/mctp
//! ```
//!
//! # Design Decisions
//! - One connection and one object server per process
//! - Both are shared handles; bindings keep clones, never own the bus

pub mod connection;
pub mod object_server;

use thiserror::Error;

pub use connection::Connection;
pub use object_server::{ObjectServer, Properties, PropertyValue};

/// Prefix of every well-known name this daemon requests.
pub const SERVICE_NAMESPACE: &str = "xyz.openbmc_project";

/// Errors reported by the bus layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("invalid bus name '{0}'")]
    InvalidName(String),

    #[error("name '{0}' is already owned")]
    NameTaken(String),

    #[error("invalid object path '{0}'")]
    InvalidObjectPath(String),

    #[error("interface {interface} already published at {path}")]
    DuplicateInterface { path: String, interface: String },

    #[error("interface {interface} not published at {path}")]
    UnknownInterface { path: String, interface: String },

    #[error("no object at {0}")]
    UnknownObject(String),
}

/// Well-known service name for a logical name.
pub fn service_name(logical_name: &str) -> String {
    format!("{}.{}", SERVICE_NAMESPACE, logical_name)
}
