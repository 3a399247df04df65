//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::lifecycle::Options;

#[derive(Debug, Parser)]
#[command(name = "mctpd")]
#[command(about = "MCTP Daemon", long_about = None, version)]
pub struct Cli {
    /// MCTP physical binding. Supported: -b smbus, -b pcie
    #[arg(short, long)]
    pub binding: String,

    /// Path to configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl Cli {
    pub fn into_options(self) -> Options {
        Options {
            binding: self.binding,
            config_path: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_required() {
        assert!(Cli::try_parse_from(["mctpd"]).is_err());
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["mctpd", "-b", "smbus"]).unwrap();
        let options = cli.into_options();
        assert_eq!(options.binding, "smbus");
        assert_eq!(options.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_long_flags() {
        let cli =
            Cli::try_parse_from(["mctpd", "--binding", "pcie", "--config", "/tmp/mctp.toml"])
                .unwrap();
        assert_eq!(cli.binding, "pcie");
        assert_eq!(cli.config, PathBuf::from("/tmp/mctp.toml"));
    }

    #[test]
    fn test_selector_not_validated() {
        // The loader decides which selectors are supported.
        let cli = Cli::try_parse_from(["mctpd", "-b", "i3c"]).unwrap();
        assert_eq!(cli.binding, "i3c");
    }
}
