//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::bus::Connection;
use crate::config::schema::{BindingKind, Configuration, Document, Section};
use crate::config::validation::{validate, ValidationError};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "/usr/share/mctp/mctp_config.json";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported binding '{0}' (supported: smbus, pcie)")]
    UnsupportedBinding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source of the daemon's named configuration.
///
/// Returns `Ok(None)` when the source holds nothing for the requested
/// binding; that is not an error but is still fatal for the daemon.
pub trait ConfigurationLoader {
    fn load(
        &self,
        conn: &Connection,
        binding: &str,
        path: &Path,
    ) -> Result<Option<(String, Configuration)>, ConfigError>;
}

/// Loads the configuration from a JSON or TOML document on disk.
///
/// The document holds one section per binding kind:
///
/// ```json
/// {
///     "smbus": { "name": "MCTP-smbus", "bus": "/dev/i2c-2", "mode": "Endpoint" },
///     "pcie": { "bdf": 512, "get-routing-interval-secs": 5 }
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigLoader;

impl ConfigurationLoader for FileConfigLoader {
    fn load(
        &self,
        _conn: &Connection,
        binding: &str,
        path: &Path,
    ) -> Result<Option<(String, Configuration)>, ConfigError> {
        let kind: BindingKind = binding.parse()?;
        let document = read_document(path)?;

        let loaded = match kind {
            BindingKind::Smbus => document
                .smbus
                .map(|section| named(kind, section, Configuration::Smbus)),
            BindingKind::Pcie => document
                .pcie
                .map(|section| named(kind, section, Configuration::Pcie)),
        };

        let Some((name, config)) = loaded else {
            tracing::debug!(binding = %kind, path = %path.display(), "No section for binding");
            return Ok(None);
        };

        validate(&name, &config).map_err(ConfigError::Validation)?;

        tracing::debug!(binding = %kind, name = %name, "Configuration loaded");
        Ok(Some((name, config)))
    }
}

fn named<T>(
    kind: BindingKind,
    section: Section<T>,
    wrap: impl FnOnce(T) -> Configuration,
) -> (String, Configuration) {
    let name = section
        .name
        .unwrap_or_else(|| format!("MCTP-{}", kind.as_str()));
    (name, wrap(section.config))
}

/// Read and parse a document, picking the format from the file extension.
fn read_document(path: &Path) -> Result<Document, ConfigError> {
    let content = fs::read_to_string(path)?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    } else {
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
