//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check EID assignments against the reserved ranges
//! - Check addresses and intervals are in range
//! - Check the medium matches the binding
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the loaded name and configuration
//! - Runs before the configuration is handed to the lifecycle controller

use thiserror::Error;

use crate::config::schema::{
    BindingKind, BindingMode, BindingParams, Configuration, PcieConfiguration, SmbusConfiguration,
};

/// Lowest EID that may be assigned to an endpoint. 1..=7 are reserved.
pub const MIN_ASSIGNABLE_EID: u8 = 8;

/// Broadcast EID.
pub const BROADCAST_EID: u8 = 0xff;

/// A single semantic problem in a configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid logical name '{0}'")]
    InvalidName(String),

    #[error("EID {0} is reserved or broadcast")]
    ReservedEid(u8),

    #[error("EID pool entry {0} is outside 8..=254")]
    PoolEidOutOfRange(u8),

    #[error("EID pool contains the default EID {0}")]
    PoolContainsDefaultEid(u8),

    #[error("bus owner requires a non-empty EID pool")]
    EmptyEidPool,

    #[error("{field} address {value:#04x} is not a 7-bit address")]
    InvalidAddress { field: &'static str, value: u8 },

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("medium {medium:?} does not belong to the {binding} binding")]
    MediumMismatch { medium: String, binding: BindingKind },

    #[error("bus device path is empty")]
    EmptyBusPath,
}

/// Validate a loaded section. Collects every error found.
pub fn validate(name: &str, config: &Configuration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_logical_name(name) {
        errors.push(ValidationError::InvalidName(name.to_string()));
    }

    validate_common(config.common(), &mut errors);

    let medium = config.medium_id();
    if medium.family() != config.kind() {
        errors.push(ValidationError::MediumMismatch {
            medium: format!("{:?}", medium),
            binding: config.kind(),
        });
    }

    match config {
        Configuration::Smbus(smbus) => validate_smbus(smbus, &mut errors),
        Configuration::Pcie(pcie) => validate_pcie(pcie, &mut errors),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Logical names become the last element of a bus name.
pub fn is_valid_logical_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_common(params: &BindingParams, errors: &mut Vec<ValidationError>) {
    let eid = params.default_eid;
    if eid == BROADCAST_EID || (eid != 0 && eid < MIN_ASSIGNABLE_EID) {
        errors.push(ValidationError::ReservedEid(eid));
    }
    if params.req_to_resp_time_ms == 0 {
        errors.push(ValidationError::ZeroInterval("req-to-resp-time-ms"));
    }
}

fn validate_smbus(config: &SmbusConfiguration, errors: &mut Vec<ValidationError>) {
    if config.bus.trim().is_empty() {
        errors.push(ValidationError::EmptyBusPath);
    }

    if config.bmc_slave_address > 0x7f {
        errors.push(ValidationError::InvalidAddress {
            field: "bmc-slave-address",
            value: config.bmc_slave_address,
        });
    }
    for &addr in config.supported_endpoint_slave_addresses.iter().filter(|a| **a > 0x7f) {
        errors.push(ValidationError::InvalidAddress {
            field: "supported-endpoint-slave-addresses",
            value: addr,
        });
    }

    for &eid in &config.eid_pool {
        if !(MIN_ASSIGNABLE_EID..BROADCAST_EID).contains(&eid) {
            errors.push(ValidationError::PoolEidOutOfRange(eid));
        }
    }
    let default_eid = config.common.default_eid;
    if default_eid != 0 && config.eid_pool.contains(&default_eid) {
        errors.push(ValidationError::PoolContainsDefaultEid(default_eid));
    }
    if config.common.mode == BindingMode::BusOwner && config.eid_pool.is_empty() {
        errors.push(ValidationError::EmptyEidPool);
    }

    if config.scan_interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval("scan-interval-secs"));
    }
}

fn validate_pcie(config: &PcieConfiguration, errors: &mut Vec<ValidationError>) {
    if config.get_routing_interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval("get-routing-interval-secs"));
    }
}
