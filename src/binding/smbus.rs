//! SMBus/I2C binding.
//!
//! # Responsibilities
//! - Open the adapter device node
//! - Publish the SMBus binding objects
//! - Run the periodic endpoint scan timer
//!
//! # Design Decisions
//! - Packet framing and endpoint discovery live behind the scan timer and
//!   are not part of this crate

use std::path::Path;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::binding::{BindingCore, InitError, MctpBinding};
use crate::bus::{ObjectServer, Properties};
use crate::config::{BindingKind, SmbusConfiguration};
use crate::hw::StreamDescriptor;

pub const SMBUS_INTERFACE: &str = "xyz.openbmc_project.MCTP.Binding.SMBus";

/// Binding over an I2C/SMBus adapter.
#[derive(Debug)]
pub struct SmbusBinding {
    core: BindingCore,
    config: SmbusConfiguration,
    stream: StreamDescriptor,
}

impl SmbusBinding {
    pub fn new(
        object_server: ObjectServer,
        base_path: &str,
        config: SmbusConfiguration,
        stream: StreamDescriptor,
    ) -> Self {
        Self {
            core: BindingCore::new(object_server, base_path),
            config,
            stream,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_open()
    }

    /// Number of background tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.core.active_tasks()
    }

    fn start_scan_timer(&mut self) {
        let period = Duration::from_secs(u64::from(self.config.scan_interval_secs));
        let bus = self.config.bus.clone();
        let candidates = self.config.supported_endpoint_slave_addresses.len();

        self.core.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!(bus = %bus, candidates, "SMBus endpoint scan");
            }
        });
    }
}

impl MctpBinding for SmbusBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Smbus
    }

    fn service_name(&self) -> Option<&str> {
        self.core.service_name()
    }

    fn set_service_name(&mut self, name: String) {
        self.core.set_service_name(name);
    }

    fn initialize(&mut self) -> Result<(), InitError> {
        self.core.begin_initialize()?;

        self.stream.assign(Path::new(&self.config.bus))?;

        let mut properties = Properties::new();
        properties.insert("BusPath".into(), self.config.bus.clone().into());
        properties.insert("SlaveAddress".into(), self.config.bmc_slave_address.into());
        properties.insert("ArpMasterSupport".into(), self.config.arp_master_support.into());
        self.core.publish(
            BindingKind::Smbus,
            &self.config.common,
            self.config.medium_id,
            SMBUS_INTERFACE,
            properties,
        )?;

        self.start_scan_timer();

        tracing::info!(
            bus = %self.config.bus,
            mode = ?self.config.common.mode,
            path = %self.core.base_path(),
            "SMBus binding initialized"
        );
        Ok(())
    }
}
