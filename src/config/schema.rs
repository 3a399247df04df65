//! Configuration schema definitions.
//!
//! This module defines the configuration model for the daemon. A document
//! holds one section per binding kind; exactly one section is selected at
//! startup and turned into a [`Configuration`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::loader::ConfigError;

/// Physical binding kinds the daemon can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Smbus,
    Pcie,
}

impl BindingKind {
    /// Selector string as accepted on the command line and used as the
    /// section key in the configuration document.
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Smbus => "smbus",
            BindingKind::Pcie => "pcie",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smbus" => Ok(BindingKind::Smbus),
            "pcie" => Ok(BindingKind::Pcie),
            _ => Err(ConfigError::UnsupportedBinding(s.to_string())),
        }
    }
}

/// Role of this endpoint on the physical medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum BindingMode {
    BusOwner,
    #[default]
    Endpoint,
    Bridge,
}

/// MCTP physical medium identifiers (DSP0239).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MediumId {
    Smbus,
    SmbusI2c,
    I2cCompatible,
    Smbus3OrI2c400khzCompatible,
    Smbus3OrI2c1MhzCompatible,
    I2c3Mhz4Compatible,
    Pcie11,
    Pcie2,
    Pcie21,
    Pcie3,
    Pcie4,
    Pcie5,
}

impl MediumId {
    /// Wire value of the identifier.
    pub fn id(&self) -> u8 {
        match self {
            MediumId::Smbus => 0x01,
            MediumId::SmbusI2c => 0x02,
            MediumId::I2cCompatible => 0x03,
            MediumId::Smbus3OrI2c400khzCompatible => 0x04,
            MediumId::Smbus3OrI2c1MhzCompatible => 0x05,
            MediumId::I2c3Mhz4Compatible => 0x06,
            MediumId::Pcie11 => 0x08,
            MediumId::Pcie2 => 0x09,
            MediumId::Pcie21 => 0x0a,
            MediumId::Pcie3 => 0x0b,
            MediumId::Pcie4 => 0x0c,
            MediumId::Pcie5 => 0x0d,
        }
    }

    /// Binding family this medium belongs to.
    pub fn family(&self) -> BindingKind {
        if self.id() < 0x08 {
            BindingKind::Smbus
        } else {
            BindingKind::Pcie
        }
    }
}

/// Parameters shared by every binding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BindingParams {
    /// Bus owner, endpoint or bridge.
    #[serde(default)]
    pub mode: BindingMode,

    /// Statically assigned EID; 0 means "assigned by the bus owner".
    #[serde(default)]
    pub default_eid: u8,

    /// Time to wait for a response before a request is retried.
    #[serde(default = "default_req_to_resp_time_ms")]
    pub req_to_resp_time_ms: u32,

    /// Number of request retries before giving up.
    #[serde(default = "default_req_retry_count")]
    pub req_retry_count: u8,
}

impl Default for BindingParams {
    fn default() -> Self {
        Self {
            mode: BindingMode::default(),
            default_eid: 0,
            req_to_resp_time_ms: default_req_to_resp_time_ms(),
            req_retry_count: default_req_retry_count(),
        }
    }
}

fn default_req_to_resp_time_ms() -> u32 {
    100
}

fn default_req_retry_count() -> u8 {
    2
}

/// SMBus/I2C binding configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SmbusConfiguration {
    #[serde(flatten)]
    pub common: BindingParams,

    #[serde(default = "default_smbus_medium")]
    pub medium_id: MediumId,

    /// Device node of the I2C/SMBus adapter (e.g. `/dev/i2c-2`).
    pub bus: String,

    #[serde(default)]
    pub arp_master_support: bool,

    /// 7-bit slave address the BMC answers on.
    #[serde(default = "default_bmc_slave_address")]
    pub bmc_slave_address: u8,

    #[serde(default)]
    pub supported_endpoint_slave_addresses: BTreeSet<u8>,

    /// EIDs handed out when acting as bus owner.
    #[serde(default)]
    pub eid_pool: BTreeSet<u8>,

    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u16,
}

fn default_smbus_medium() -> MediumId {
    MediumId::Smbus
}

fn default_bmc_slave_address() -> u8 {
    0x10
}

fn default_scan_interval_secs() -> u16 {
    10
}

/// PCIe VDM binding configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PcieConfiguration {
    #[serde(flatten)]
    pub common: BindingParams,

    #[serde(default = "default_pcie_medium")]
    pub medium_id: MediumId,

    /// Bus/device/function of the local MCTP controller.
    #[serde(default)]
    pub bdf: u16,

    #[serde(default = "default_get_routing_interval_secs")]
    pub get_routing_interval_secs: u8,

    /// Driver character device.
    #[serde(default = "default_pcie_device")]
    pub device: String,

    /// File exposing the current link state.
    #[serde(default = "default_link_state_path")]
    pub link_state_path: String,
}

fn default_pcie_medium() -> MediumId {
    MediumId::Pcie3
}

fn default_get_routing_interval_secs() -> u8 {
    5
}

fn default_pcie_device() -> String {
    "/dev/mctp-pcie".to_string()
}

fn default_link_state_path() -> String {
    "/sys/class/mctp-pcie/link_state".to_string()
}

/// One binding's configuration, discriminated by binding kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Configuration {
    Smbus(SmbusConfiguration),
    Pcie(PcieConfiguration),
}

impl Configuration {
    pub fn kind(&self) -> BindingKind {
        match self {
            Configuration::Smbus(_) => BindingKind::Smbus,
            Configuration::Pcie(_) => BindingKind::Pcie,
        }
    }

    pub fn common(&self) -> &BindingParams {
        match self {
            Configuration::Smbus(c) => &c.common,
            Configuration::Pcie(c) => &c.common,
        }
    }

    pub fn medium_id(&self) -> MediumId {
        match self {
            Configuration::Smbus(c) => c.medium_id,
            Configuration::Pcie(c) => c.medium_id,
        }
    }
}

/// A document section: the binding configuration plus its logical name.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Section<T> {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub config: T,
}

/// Root of a configuration document. Each key is optional; the selector
/// picks which one is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Document {
    #[serde(default)]
    pub smbus: Option<Section<SmbusConfiguration>>,

    #[serde(default)]
    pub pcie: Option<Section<PcieConfiguration>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_kind_parse() {
        assert_eq!("smbus".parse::<BindingKind>().unwrap(), BindingKind::Smbus);
        assert_eq!("PCIe".parse::<BindingKind>().unwrap(), BindingKind::Pcie);

        let err = "usb".parse::<BindingKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedBinding(ref s) if s == "usb"));
    }

    #[test]
    fn test_medium_family() {
        assert_eq!(MediumId::Smbus.family(), BindingKind::Smbus);
        assert_eq!(MediumId::I2c3Mhz4Compatible.family(), BindingKind::Smbus);
        assert_eq!(MediumId::Pcie11.family(), BindingKind::Pcie);
        assert_eq!(MediumId::Pcie5.id(), 0x0d);
    }

    #[test]
    fn test_smbus_defaults() {
        let config: SmbusConfiguration =
            serde_json::from_str(r#"{ "bus": "/dev/i2c-2" }"#).unwrap();
        assert_eq!(config.bus, "/dev/i2c-2");
        assert_eq!(config.medium_id, MediumId::Smbus);
        assert_eq!(config.bmc_slave_address, 0x10);
        assert_eq!(config.scan_interval_secs, 10);
        assert_eq!(config.common, BindingParams::default());
    }

    #[test]
    fn test_smbus_bus_required() {
        let result: Result<SmbusConfiguration, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }

    #[test]
    fn test_pcie_common_params_flattened() {
        let config: PcieConfiguration = serde_json::from_str(
            r#"{ "mode": "BusOwner", "default-eid": 10, "bdf": 512 }"#,
        )
        .unwrap();
        assert_eq!(config.common.mode, BindingMode::BusOwner);
        assert_eq!(config.common.default_eid, 10);
        assert_eq!(config.bdf, 512);
        assert_eq!(config.device, "/dev/mctp-pcie");

        let config = Configuration::Pcie(config);
        assert_eq!(config.kind(), BindingKind::Pcie);
        assert_eq!(config.medium_id(), MediumId::Pcie3);
    }
}
