//! MCTP daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   -b <binding> -c <config>
//!            │
//!            ▼
//!   ┌─────────────────┐    ┌──────────────┐    ┌───────────────────┐
//!   │ lifecycle       │───▶│ config       │───▶│ (name, Configuration)
//!   │ runtime+signals │    │ loader       │    └─────────┬─────────┘
//!   └────────┬────────┘    └──────────────┘              │
//!            │                                           ▼
//!            │   ┌──────────────┐    ┌─────────────────────────────┐
//!            ├──▶│ bus          │◀───│ binding factory             │
//!            │   │ name+objects │    │ SmbusBinding | PcieBinding  │
//!            │   └──────────────┘    └──────────────┬──────────────┘
//!            │                                      │
//!            ▼                                      ▼
//!   event loop ── SIGINT/SIGTERM ──▶ destroy binding ──▶ stop loop
//! ```

use std::process::ExitCode;

use clap::Parser;

use mctpd::cli::Cli;
use mctpd::lifecycle::Daemon;
use mctpd::observability::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    tracing::info!(binding = %cli.binding, config = %cli.config.display(), "mctpd starting");

    let mut daemon = match Daemon::new(cli.into_options()) {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up daemon; exiting");
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = daemon.start() {
        return ExitCode::from(e.exit_code());
    }

    daemon.run();

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
