//! Hardware access used by the bindings.
//!
//! # Data Flow
//! ```text
//! SMBus binding → StreamDescriptor (I2C adapter device node)
//! PCIe binding  → DeviceDriver (MCTP controller device node)
//!               → LinkMonitor  (link state → watch channel)
//! ```
//!
//! # Design Decisions
//! - Drivers and monitors are traits so bindings can be built against
//!   other controllers without changing the binding
//! - Nothing touches the hardware until the binding is initialized
//! - Every handle is released on drop

pub mod pcie;
pub mod stream;

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::watch;

pub use pcie::{PcieDriver, PcieMonitor};
pub use stream::StreamDescriptor;

/// Errors raised by hardware handles.
#[derive(Debug, Error)]
pub enum HwError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read link state from {}: {source}", .path.display())]
    LinkState {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),
}

/// Physical link state reported by a [`LinkMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

impl LinkState {
    /// Parse the textual form exposed by the kernel. Unknown text yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "1" | "up" => Some(LinkState::Up),
            "0" | "down" => Some(LinkState::Down),
            _ => None,
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, LinkState::Up)
    }
}

/// Driver for an MCTP-capable controller.
pub trait DeviceDriver: Send {
    /// Acquire the device.
    fn init(&mut self) -> Result<(), HwError>;

    fn is_open(&self) -> bool;
}

/// Watches the physical link of a controller.
pub trait LinkMonitor: Send {
    /// Start monitoring and return a receiver of link state changes.
    fn initialize(&mut self) -> Result<watch::Receiver<LinkState>, HwError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_parse() {
        assert_eq!(LinkState::parse("1\n"), Some(LinkState::Up));
        assert_eq!(LinkState::parse("UP"), Some(LinkState::Up));
        assert_eq!(LinkState::parse("down"), Some(LinkState::Down));
        assert_eq!(LinkState::parse("0"), Some(LinkState::Down));
        assert_eq!(LinkState::parse("training"), None);
    }
}
