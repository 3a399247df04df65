//! Startup orchestration.
//!
//! # Responsibilities
//! - Create the execution context and register signal handlers first
//! - Load the configuration and claim the service name
//! - Construct, name and initialize the binding
//! - Run the event loop until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and ends the process
//! - Steps run in order, never concurrently, and are never retried
//! - Nothing touches the bus before the configuration is known to be good

use std::path::PathBuf;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::binding::{BindingFactory, DefaultBindingFactory, InitError};
use crate::bus::{self, BusError, Connection, ObjectServer};
use crate::config::{ConfigError, Configuration, ConfigurationLoader, FileConfigLoader};
use crate::lifecycle::shutdown::{BindingSlot, Shutdown, Terminator};
use crate::lifecycle::signals;
use crate::lifecycle::state::{LifecycleState, StateTracker};

/// Exit status for every startup failure.
pub const FAILURE_EXIT_CODE: u8 = 255;

/// Inputs taken from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    /// Binding selector, interpreted by the configuration loader.
    pub binding: String,
    /// Configuration document.
    pub config_path: PathBuf,
}

/// Reasons the daemon cannot start.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to set up execution context: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[source] ConfigError),

    #[error("no configuration found")]
    NoConfiguration,

    #[error("failed to acquire service name: {0}")]
    Bus(#[from] BusError),

    #[error("unable to create binding")]
    NoBinding,

    #[error("failed to initialize binding: {0}")]
    Initialization(#[source] InitError),
}

impl DaemonError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        FAILURE_EXIT_CODE
    }
}

/// The daemon process: owns the execution context and everything bound to it.
///
/// Fields are ordered so the binding slot drops before the runtime.
pub struct Daemon<L = FileConfigLoader, F = DefaultBindingFactory> {
    options: Options,
    loader: L,
    factory: F,
    binding: BindingSlot,
    shutdown: Shutdown,
    state: StateTracker,
    configuration: Option<(String, Configuration)>,
    service_name: Option<String>,
    object_server: Option<ObjectServer>,
    conn: Option<Connection>,
    signal_watcher: JoinHandle<()>,
    runtime: Runtime,
}

impl Daemon {
    /// Daemon reading its configuration from disk with the built-in bindings.
    pub fn new(options: Options) -> Result<Self, DaemonError> {
        Self::with_parts(options, FileConfigLoader, DefaultBindingFactory)
    }
}

impl<L, F> Daemon<L, F>
where
    L: ConfigurationLoader,
    F: BindingFactory,
{
    /// Create the execution context and register the termination watcher.
    pub fn with_parts(options: Options, loader: L, factory: F) -> Result<Self, DaemonError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(DaemonError::Runtime)?;

        let binding = BindingSlot::new();
        let shutdown = Shutdown::new();
        let state = StateTracker::new();
        let terminator = Terminator::new(
            runtime.handle().clone(),
            binding.clone(),
            shutdown.clone(),
            state.clone(),
        );
        let signal_watcher =
            signals::watch(runtime.handle(), terminator).map_err(DaemonError::Runtime)?;

        Ok(Self {
            options,
            loader,
            factory,
            binding,
            shutdown,
            state,
            configuration: None,
            service_name: None,
            object_server: None,
            conn: None,
            signal_watcher,
            runtime,
        })
    }

    /// Bring the daemon up to `Initialized`. On error the failure has been
    /// logged and the caller should exit with [`DaemonError::exit_code`].
    pub fn start(&mut self) -> Result<(), DaemonError> {
        let handle = self.runtime.handle().clone();
        let conn = Connection::new(handle.clone());
        self.conn = Some(conn.clone());

        let loaded = self
            .loader
            .load(&conn, &self.options.binding, &self.options.config_path);
        let (name, configuration) = match loaded {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                tracing::error!(
                    binding = %self.options.binding,
                    path = %self.options.config_path.display(),
                    "No configuration found; exiting"
                );
                return Err(DaemonError::NoConfiguration);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Configuration error");
                tracing::error!("Invalid configuration; exiting");
                return Err(DaemonError::InvalidConfiguration(e));
            }
        };
        self.state.set(LifecycleState::ConfigLoaded);

        let service_name = bus::service_name(&name);
        if let Err(e) = conn.request_name(&service_name) {
            tracing::error!(error = %e, "Unable to acquire service name; exiting");
            return Err(e.into());
        }
        tracing::info!(service = %service_name, "Starting MCTP service");
        self.state.set(LifecycleState::BoundToBus);

        let object_server = ObjectServer::new(conn.clone(), true);
        self.object_server = Some(object_server.clone());

        let Some(mut binding) = self
            .factory
            .create(&configuration, &conn, &object_server, &handle)
        else {
            tracing::error!(binding = %configuration.kind(), "Unable to create MCTP binding");
            return Err(DaemonError::NoBinding);
        };
        self.configuration = Some((name, configuration));
        self.state.set(LifecycleState::BindingConstructed);

        binding.set_service_name(service_name.clone());
        self.service_name = Some(service_name);

        if let Err(e) = binding.initialize() {
            tracing::warn!(error = %e, "Binding initialization error");
            tracing::error!("Failed to initialize MCTP binding; exiting");
            // Release whatever the binding acquired while the context is alive.
            drop(binding);
            return Err(DaemonError::Initialization(e));
        }

        self.binding.install(binding);
        self.state.set(LifecycleState::Initialized);
        Ok(())
    }

    /// Run the event loop until a termination request has destroyed the
    /// binding and stopped the loop.
    pub fn run(self) {
        if !self.shutdown.is_triggered() {
            self.state.set(LifecycleState::Running);
        }
        tracing::info!(service = ?self.service_name, "Event loop running");

        let mut stop = self.shutdown.subscribe();
        let binding = self.binding.clone();
        self.runtime.block_on(async move {
            stop.recv().await;
            // Covers a binding installed after an early trip.
            binding.reset();
        });

        self.signal_watcher.abort();
        self.state.set(LifecycleState::Stopped);
        tracing::info!("Event loop stopped");
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Receiver notified on every lifecycle transition.
    pub fn state_watch(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Handle that runs the same sequence as a termination signal.
    pub fn terminator(&self) -> Terminator {
        Terminator::new(
            self.runtime.handle().clone(),
            self.binding.clone(),
            self.shutdown.clone(),
            self.state.clone(),
        )
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub fn object_server(&self) -> Option<&ObjectServer> {
        self.object_server.as_ref()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub fn configuration(&self) -> Option<&(String, Configuration)> {
        self.configuration.as_ref()
    }

    pub fn has_binding(&self) -> bool {
        self.binding.is_occupied()
    }
}
