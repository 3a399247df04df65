//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (select section by binding kind, deserialize)
//!     → validation.rs (semantic checks)
//!     → (logical name, Configuration) (validated, immutable)
//!     → owned by the lifecycle controller, lent to the binding factory
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - One document may describe several bindings; the selector picks one
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ConfigurationLoader, FileConfigLoader, DEFAULT_CONFIG_PATH};
pub use schema::{
    BindingKind, BindingMode, BindingParams, Configuration, MediumId, PcieConfiguration,
    SmbusConfiguration,
};
