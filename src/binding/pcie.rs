//! PCIe VDM binding.
//!
//! # Responsibilities
//! - Initialize the controller driver and the link monitor
//! - Publish the PCIe binding objects and mirror link state into them
//! - Run the periodic routing table refresh timer

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::binding::{BindingCore, InitError, MctpBinding};
use crate::bus::{ObjectServer, Properties};
use crate::config::{BindingKind, PcieConfiguration};
use crate::hw::{DeviceDriver, LinkMonitor};

pub const PCIE_INTERFACE: &str = "xyz.openbmc_project.MCTP.Binding.PCIe";

/// Binding over a PCIe MCTP controller.
pub struct PcieBinding {
    // Declared first so timers stop before the hardware handles go away.
    core: BindingCore,
    config: PcieConfiguration,
    driver: Box<dyn DeviceDriver>,
    monitor: Box<dyn LinkMonitor>,
}

impl PcieBinding {
    pub fn new(
        object_server: ObjectServer,
        base_path: &str,
        config: PcieConfiguration,
        driver: Box<dyn DeviceDriver>,
        monitor: Box<dyn LinkMonitor>,
    ) -> Self {
        Self {
            core: BindingCore::new(object_server, base_path),
            config,
            driver,
            monitor,
        }
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_open()
    }

    /// Number of background tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.core.active_tasks()
    }

    fn start_routing_timer(&mut self) {
        let period = Duration::from_secs(u64::from(self.config.get_routing_interval_secs));
        let bdf = self.config.bdf;

        self.core.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!(bdf = %format!("{:#06x}", bdf), "PCIe routing table refresh");
            }
        });
    }
}

impl MctpBinding for PcieBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Pcie
    }

    fn service_name(&self) -> Option<&str> {
        self.core.service_name()
    }

    fn set_service_name(&mut self, name: String) {
        self.core.set_service_name(name);
    }

    fn initialize(&mut self) -> Result<(), InitError> {
        self.core.begin_initialize()?;

        self.driver.init()?;
        let mut link = self.monitor.initialize()?;
        let link_up = link.borrow_and_update().is_up();

        let mut properties = Properties::new();
        properties.insert("BDF".into(), self.config.bdf.into());
        properties.insert("LinkUp".into(), link_up.into());
        self.core.publish(
            BindingKind::Pcie,
            &self.config.common,
            self.config.medium_id,
            PCIE_INTERFACE,
            properties,
        )?;

        let server = self.core.object_server().clone();
        let path = self.core.base_path().to_string();
        self.core.spawn(async move {
            while link.changed().await.is_ok() {
                let up = link.borrow_and_update().is_up();
                if let Err(e) = server.set_property(&path, PCIE_INTERFACE, "LinkUp", up.into()) {
                    tracing::warn!(error = %e, "Failed to publish link state");
                }
            }
        });

        self.start_routing_timer();

        tracing::info!(
            bdf = %format!("{:#06x}", self.config.bdf),
            mode = ?self.config.common.mode,
            link_up,
            "PCIe binding initialized"
        );
        Ok(())
    }
}
