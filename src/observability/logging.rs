//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem once at process start
//! - Take the log level from `RUST_LOG`, falling back to a sane default
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Human-readable fmt output; the supervisor captures stdout

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "mctpd=info";

pub fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber.
pub fn init() {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
