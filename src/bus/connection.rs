//! Service bus connection.
//!
//! # Responsibilities
//! - Bind the connection to the execution context
//! - Own well-known names requested by this process
//!
//! # Design Decisions
//! - Cheap to clone; clones share the same connection
//! - A name can be owned once; a second request fails

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;

use crate::bus::BusError;

/// Maximum length of a bus name.
const MAX_NAME_LEN: usize = 255;

/// Shared connection to the service bus.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    handle: Handle,
    names: Mutex<BTreeSet<String>>,
}

impl Connection {
    /// Open a connection driven by the given execution context.
    pub fn new(handle: Handle) -> Self {
        tracing::debug!("Service bus connection opened");
        Self {
            inner: Arc::new(Inner {
                handle,
                names: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    /// Execution context this connection is bound to.
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// Request ownership of a well-known name.
    pub fn request_name(&self, name: &str) -> Result<(), BusError> {
        if !is_valid_bus_name(name) {
            return Err(BusError::InvalidName(name.to_string()));
        }
        if !self.names().insert(name.to_string()) {
            return Err(BusError::NameTaken(name.to_string()));
        }
        tracing::debug!(name = %name, "Bus name acquired");
        Ok(())
    }

    /// Names currently owned by this connection, sorted.
    pub fn owned_names(&self) -> Vec<String> {
        self.names().iter().cloned().collect()
    }

    fn names(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.inner.names.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Well-known names: at least two dot-separated elements of
/// `[A-Za-z0-9_-]`, none empty or starting with a digit.
pub fn is_valid_bus_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    let elements: Vec<&str> = name.split('.').collect();
    elements.len() >= 2
        && elements.iter().all(|element| {
            let mut chars = element.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}
