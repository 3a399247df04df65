//! Shared utilities for lifecycle and process tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::sync::watch;

use mctpd::binding::InitError;
use mctpd::bus::{Connection, ObjectServer};
use mctpd::config::{BindingKind, ConfigError, Configuration, ConfigurationLoader};
use mctpd::lifecycle::LifecycleState;
use mctpd::{BindingFactory, MctpBinding};

/// Temporary directory holding configuration documents and fake device nodes.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Configuration with an SMBus section backed by a fake adapter node.
    pub fn smbus_config(&self, name: &str) -> PathBuf {
        let bus = self.write("i2c-2", "");
        self.write(
            "smbus.json",
            &format!(
                r#"{{ "smbus": {{ "name": "{}", "bus": "{}", "mode": "Endpoint" }} }}"#,
                name,
                bus.display()
            ),
        )
    }

    /// Configuration with a PCIe section backed by fake driver and link files.
    pub fn pcie_config(&self, name: &str) -> PathBuf {
        let device = self.write("mctp-pcie", "");
        let link = self.write("link_state", "1\n");
        self.write(
            "pcie.toml",
            &format!(
                "[pcie]\nname = \"{}\"\nbdf = 512\ndevice = \"{}\"\nlink-state-path = \"{}\"\n",
                name,
                device.display(),
                link.display()
            ),
        )
    }
}

/// Loader returning whatever the closure produces.
pub struct FnLoader<F>(pub F);

impl<F> ConfigurationLoader for FnLoader<F>
where
    F: Fn() -> Result<Option<(String, Configuration)>, ConfigError>,
{
    fn load(
        &self,
        _conn: &Connection,
        _binding: &str,
        _path: &Path,
    ) -> Result<Option<(String, Configuration)>, ConfigError> {
        (self.0)()
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Binding that records what happens to it.
pub struct ProbeBinding {
    kind: BindingKind,
    name: Option<String>,
    fail_init: bool,
    log: EventLog,
}

impl MctpBinding for ProbeBinding {
    fn kind(&self) -> BindingKind {
        self.kind
    }

    fn service_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_service_name(&mut self, name: String) {
        self.log.lock().unwrap().push(format!("named {}", name));
        self.name = Some(name);
    }

    fn initialize(&mut self) -> Result<(), InitError> {
        if self.fail_init {
            self.log.lock().unwrap().push("init failed".into());
            return Err(InitError::NoServiceName);
        }
        self.log.lock().unwrap().push("initialized".into());
        Ok(())
    }
}

impl Drop for ProbeBinding {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("binding dropped".into());
    }
}

/// Factory producing [`ProbeBinding`]s, or nothing at all.
#[derive(Clone, Default)]
pub struct ProbeFactory {
    pub log: EventLog,
    pub calls: Arc<AtomicUsize>,
    pub produce_nothing: bool,
    pub fail_init: bool,
}

impl ProbeFactory {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BindingFactory for ProbeFactory {
    fn create(
        &self,
        config: &Configuration,
        _conn: &Connection,
        _object_server: &ObjectServer,
        _handle: &Handle,
    ) -> Option<Box<dyn MctpBinding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.produce_nothing {
            return None;
        }
        Some(Box::new(ProbeBinding {
            kind: config.kind(),
            name: None,
            fail_init: self.fail_init,
            log: self.log.clone(),
        }))
    }
}

/// Block until the daemon reports `state`, or panic after a few seconds.
pub fn wait_for_state(rx: &watch::Receiver<LifecycleState>, state: LifecycleState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while *rx.borrow() != state {
        assert!(Instant::now() < deadline, "daemon never reached {}", state);
        std::thread::sleep(Duration::from_millis(5));
    }
}
