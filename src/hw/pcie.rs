//! PCIe MCTP controller driver and link monitor.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::hw::{DeviceDriver, HwError, LinkMonitor, LinkState};

/// How often the link state file is polled.
pub const DEFAULT_LINK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Character-device driver for the PCIe VDM controller.
#[derive(Debug)]
pub struct PcieDriver {
    device: PathBuf,
    file: Option<File>,
}

impl PcieDriver {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            file: None,
        }
    }
}

impl DeviceDriver for PcieDriver {
    fn init(&mut self) -> Result<(), HwError> {
        if self.file.is_some() {
            return Err(HwError::AlreadyInitialized("PCIe driver"));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.device)
            .map_err(|source| HwError::Open {
                path: self.device.clone(),
                source,
            })?;

        tracing::info!(device = %self.device.display(), "PCIe driver initialized");
        self.file = Some(file);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for PcieDriver {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!(device = %self.device.display(), "PCIe driver released");
        }
    }
}

/// Polls a link-state file on the execution context and publishes changes.
#[derive(Debug)]
pub struct PcieMonitor {
    handle: Handle,
    path: PathBuf,
    poll_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl PcieMonitor {
    pub fn new(handle: Handle, path: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            path: path.into(),
            poll_interval: DEFAULT_LINK_POLL_INTERVAL,
            task: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl LinkMonitor for PcieMonitor {
    fn initialize(&mut self) -> Result<watch::Receiver<LinkState>, HwError> {
        if self.task.is_some() {
            return Err(HwError::AlreadyInitialized("PCIe link monitor"));
        }

        let text = std::fs::read_to_string(&self.path).map_err(|source| HwError::LinkState {
            path: self.path.clone(),
            source,
        })?;
        let initial = LinkState::parse(&text).unwrap_or(LinkState::Down);
        tracing::info!(path = %self.path.display(), state = ?initial, "PCIe link monitor started");

        let (tx, rx) = watch::channel(initial);
        let path = self.path.clone();
        let poll_interval = self.poll_interval;

        self.task = Some(self.handle.spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while !tx.is_closed() {
                ticker.tick().await;
                match tokio::fs::read_to_string(&path).await {
                    Ok(text) => {
                        let Some(state) = LinkState::parse(&text) else {
                            continue;
                        };
                        let changed = tx.send_if_modified(|current| {
                            if *current == state {
                                return false;
                            }
                            *current = state;
                            true
                        });
                        if changed {
                            tracing::info!(state = ?state, "PCIe link state changed");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to poll link state");
                    }
                }
            }
        }));

        Ok(rx)
    }
}

impl Drop for PcieMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(path = %self.path.display(), "PCIe link monitor stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_open() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let mut driver = PcieDriver::new(device.path());
        assert!(!driver.is_open());

        driver.init().unwrap();
        assert!(driver.is_open());
        assert!(matches!(driver.init(), Err(HwError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_driver_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = PcieDriver::new(dir.path().join("mctp-pcie"));
        assert!(matches!(driver.init(), Err(HwError::Open { .. })));
    }

    #[tokio::test]
    async fn test_monitor_reports_changes() {
        let link = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(link.path(), "0\n").unwrap();

        let mut monitor = PcieMonitor::new(Handle::current(), link.path())
            .with_poll_interval(Duration::from_millis(10));
        let mut rx = monitor.initialize().unwrap();
        assert_eq!(*rx.borrow(), LinkState::Down);

        std::fs::write(link.path(), "up\n").unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("link change not observed")
            .unwrap();
        assert_eq!(*rx.borrow(), LinkState::Up);
    }

    #[tokio::test]
    async fn test_monitor_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = PcieMonitor::new(Handle::current(), dir.path().join("link_state"));
        assert!(matches!(monitor.initialize(), Err(HwError::LinkState { .. })));
    }

    #[tokio::test]
    async fn test_monitor_stops_on_drop() {
        let link = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(link.path(), "1").unwrap();

        let mut monitor = PcieMonitor::new(Handle::current(), link.path())
            .with_poll_interval(Duration::from_millis(10));
        let mut rx = monitor.initialize().unwrap();
        drop(monitor);

        // The sender lives in the aborted task, so the channel closes.
        let result = tokio::time::timeout(Duration::from_secs(2), rx.changed()).await;
        assert!(matches!(result, Ok(Err(_))));
    }
}
