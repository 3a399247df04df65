//! MCTP physical bindings.
//!
//! # Data Flow
//! ```text
//! Configuration
//!     → factory.rs (match on the variant, wire hardware handles)
//!     → SmbusBinding | PcieBinding (boxed as dyn MctpBinding)
//!     → set_service_name → initialize
//!         → acquire hardware, publish objects, start timers
//!     → drop: stop timers, remove objects, release hardware
//! ```
//!
//! # Design Decisions
//! - The set of bindings is closed; adding one means a new configuration
//!   variant and a new factory arm
//! - Construction does no I/O; everything happens in `initialize`
//! - All teardown is in `Drop` and runs on the execution context

pub mod factory;
pub mod pcie;
pub mod smbus;

use std::future::Future;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::bus::{BusError, ObjectServer, Properties};
use crate::config::{BindingKind, BindingParams, MediumId};
use crate::hw::HwError;

pub use factory::{create_binding, BindingFactory, DefaultBindingFactory};
pub use pcie::PcieBinding;
pub use smbus::SmbusBinding;

/// Object path every binding publishes under.
pub const MCTP_BASE_PATH: &str = "/xyz/openbmc_project/mctp";

/// Interface carrying the properties common to all bindings.
pub const BASE_INTERFACE: &str = "xyz.openbmc_project.MCTP.Base";

/// Errors raised while initializing a binding.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("binding is already initialized")]
    AlreadyInitialized,

    #[error("service name must be set before initialization")]
    NoServiceName,

    #[error("service name '{0}' is not owned by the connection")]
    NameNotOwned(String),

    #[error("hardware error: {0}")]
    Hardware(#[from] HwError),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

/// A protocol binding for one physical transport.
pub trait MctpBinding: Send {
    fn kind(&self) -> BindingKind;

    fn service_name(&self) -> Option<&str>;

    /// Set the well-known bus name the binding serves under.
    fn set_service_name(&mut self, name: String);

    /// Acquire resources and start serving. Called once.
    fn initialize(&mut self) -> Result<(), InitError>;
}

/// State and teardown shared by every binding.
#[derive(Debug)]
pub(crate) struct BindingCore {
    object_server: ObjectServer,
    base_path: String,
    service_name: Option<String>,
    published: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl BindingCore {
    /// The connection and execution context are the object server's.
    pub(crate) fn new(object_server: ObjectServer, base_path: &str) -> Self {
        Self {
            object_server,
            base_path: base_path.to_string(),
            service_name: None,
            published: false,
            tasks: Vec::new(),
        }
    }

    pub(crate) fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub(crate) fn set_service_name(&mut self, name: String) {
        self.service_name = Some(name);
    }

    pub(crate) fn object_server(&self) -> &ObjectServer {
        &self.object_server
    }

    pub(crate) fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Checks run before any resource is acquired.
    pub(crate) fn begin_initialize(&self) -> Result<(), InitError> {
        if self.published || !self.tasks.is_empty() {
            return Err(InitError::AlreadyInitialized);
        }
        let name = self.service_name.as_deref().ok_or(InitError::NoServiceName)?;
        let conn = self.object_server.connection();
        if !conn.owned_names().iter().any(|owned| owned == name) {
            return Err(InitError::NameNotOwned(name.to_string()));
        }
        Ok(())
    }

    /// Publish the base interface plus the binding-specific interface.
    pub(crate) fn publish(
        &mut self,
        kind: BindingKind,
        params: &BindingParams,
        medium: MediumId,
        interface: &str,
        properties: Properties,
    ) -> Result<(), InitError> {
        let mut base = Properties::new();
        base.insert("Eid".into(), params.default_eid.into());
        base.insert("StaticEid".into(), (params.default_eid != 0).into());
        base.insert("BindingID".into(), binding_id(kind).into());
        base.insert("BindingMediumID".into(), format!("{:?}", medium).into());
        base.insert("BindingMode".into(), format!("{:?}", params.mode).into());

        self.object_server
            .add_interface(&self.base_path, BASE_INTERFACE, base)?;
        self.published = true;
        self.object_server
            .add_interface(&self.base_path, interface, properties)?;
        Ok(())
    }

    /// Run `future` on the execution context until the binding is dropped.
    pub(crate) fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.object_server.connection().handle();
        self.tasks.push(handle.spawn(future));
    }

    pub(crate) fn active_tasks(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Drop for BindingCore {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if self.published {
            if let Err(e) = self.object_server.remove_object(&self.base_path) {
                tracing::warn!(error = %e, "Failed to remove binding objects");
            }
        }
        tracing::debug!(service = ?self.service_name, "Binding released");
    }
}

fn binding_id(kind: BindingKind) -> &'static str {
    match kind {
        BindingKind::Smbus => "SMBus",
        BindingKind::Pcie => "PCIe",
    }
}
