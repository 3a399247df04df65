//! Binding construction.
//!
//! # Responsibilities
//! - Pick the binding implementation matching the configuration variant
//! - Wire it to the connection, object server and execution context
//!
//! # Design Decisions
//! - One `match` over the closed configuration enum
//! - No I/O here; hardware is touched in `MctpBinding::initialize`

use tokio::runtime::Handle;

use crate::binding::{MctpBinding, PcieBinding, SmbusBinding, MCTP_BASE_PATH};
use crate::bus::{Connection, ObjectServer};
use crate::config::Configuration;
use crate::hw::{PcieDriver, PcieMonitor, StreamDescriptor};

/// Builds the binding for a loaded configuration.
///
/// Returning `None` means no binding serves this configuration; the
/// lifecycle controller treats that as fatal.
pub trait BindingFactory {
    fn create(
        &self,
        config: &Configuration,
        conn: &Connection,
        object_server: &ObjectServer,
        handle: &Handle,
    ) -> Option<Box<dyn MctpBinding>>;
}

/// Factory for the bindings shipped with the daemon.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBindingFactory;

impl BindingFactory for DefaultBindingFactory {
    fn create(
        &self,
        config: &Configuration,
        _conn: &Connection,
        object_server: &ObjectServer,
        handle: &Handle,
    ) -> Option<Box<dyn MctpBinding>> {
        create_binding(config, object_server, handle)
    }
}

/// Construct the binding matching `config`.
///
/// Bindings reach the connection through `object_server`; `handle` drives
/// the collaborators that poll hardware.
pub fn create_binding(
    config: &Configuration,
    object_server: &ObjectServer,
    handle: &Handle,
) -> Option<Box<dyn MctpBinding>> {
    let binding: Box<dyn MctpBinding> = match config {
        Configuration::Smbus(smbus) => Box::new(SmbusBinding::new(
            object_server.clone(),
            MCTP_BASE_PATH,
            smbus.clone(),
            StreamDescriptor::new(),
        )),
        Configuration::Pcie(pcie) => Box::new(PcieBinding::new(
            object_server.clone(),
            MCTP_BASE_PATH,
            pcie.clone(),
            Box::new(PcieDriver::new(&pcie.device)),
            Box::new(PcieMonitor::new(handle.clone(), &pcie.link_state_path)),
        )),
    };

    tracing::debug!(binding = %binding.kind(), "Binding constructed");
    Some(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BindingKind, BindingParams, MediumId, PcieConfiguration, SmbusConfiguration};

    fn smbus() -> Configuration {
        Configuration::Smbus(SmbusConfiguration {
            common: BindingParams::default(),
            medium_id: MediumId::Smbus,
            bus: "/dev/i2c-does-not-exist".into(),
            arp_master_support: false,
            bmc_slave_address: 0x10,
            supported_endpoint_slave_addresses: Default::default(),
            eid_pool: Default::default(),
            scan_interval_secs: 10,
        })
    }

    fn pcie() -> Configuration {
        Configuration::Pcie(PcieConfiguration {
            common: BindingParams::default(),
            medium_id: MediumId::Pcie3,
            bdf: 0,
            get_routing_interval_secs: 5,
            device: "/dev/mctp-pcie-does-not-exist".into(),
            link_state_path: "/sys/does/not/exist".into(),
        })
    }

    #[tokio::test]
    async fn test_variant_matches_configuration() {
        let handle = Handle::current();
        let server = ObjectServer::new(Connection::new(handle.clone()), true);

        for config in [smbus(), pcie()] {
            let binding = create_binding(&config, &server, &handle)
                .expect("binding for a known variant");
            assert_eq!(binding.kind(), config.kind());
            assert!(binding.service_name().is_none());
        }
    }

    #[tokio::test]
    async fn test_construction_does_no_io() {
        let handle = Handle::current();
        let conn = Connection::new(handle.clone());
        let server = ObjectServer::new(conn.clone(), true);

        // Device paths do not exist; construction must still succeed.
        let binding = DefaultBindingFactory.create(&pcie(), &conn, &server, &handle);
        assert_eq!(binding.map(|b| b.kind()), Some(BindingKind::Pcie));
        assert!(server.object_paths().is_empty());
        assert!(conn.owned_names().is_empty());
    }
}
