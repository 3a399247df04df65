//! Object-exposure server.
//!
//! Holds the objects this process publishes on the service bus: object
//! paths, the interfaces implemented at each path, and their properties.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bus::{BusError, Connection};

/// A property value as published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    U16(u16),
    U32(u32),
    Str(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Byte(v) => write!(f, "{}", v),
            PropertyValue::U16(v) => write!(f, "{}", v),
            PropertyValue::U32(v) => write!(f, "{}", v),
            PropertyValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<u8> for PropertyValue {
    fn from(v: u8) -> Self {
        PropertyValue::Byte(v)
    }
}

impl From<u16> for PropertyValue {
    fn from(v: u16) -> Self {
        PropertyValue::U16(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::U32(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

type Interfaces = BTreeMap<String, Properties>;

/// Server publishing objects over a [`Connection`].
///
/// Clones share the same object tree.
#[derive(Debug, Clone)]
pub struct ObjectServer {
    conn: Connection,
    object_manager: bool,
    objects: Arc<Mutex<BTreeMap<String, Interfaces>>>,
}

impl ObjectServer {
    /// Create a server on `conn`. With `object_manager` set, published
    /// objects are discoverable through the standard object manager.
    pub fn new(conn: Connection, object_manager: bool) -> Self {
        tracing::debug!(object_manager, "Object server created");
        Self {
            conn,
            object_manager,
            objects: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn object_manager(&self) -> bool {
        self.object_manager
    }

    /// Publish `interface` with `properties` at `path`.
    pub fn add_interface(
        &self,
        path: &str,
        interface: &str,
        properties: Properties,
    ) -> Result<(), BusError> {
        if !is_valid_object_path(path) {
            return Err(BusError::InvalidObjectPath(path.to_string()));
        }

        let mut objects = self.objects();
        let interfaces = objects.entry(path.to_string()).or_default();
        if interfaces.contains_key(interface) {
            return Err(BusError::DuplicateInterface {
                path: path.to_string(),
                interface: interface.to_string(),
            });
        }
        interfaces.insert(interface.to_string(), properties);

        tracing::debug!(path = %path, interface = %interface, "Interface published");
        Ok(())
    }

    /// Update a single property of a published interface.
    pub fn set_property(
        &self,
        path: &str,
        interface: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), BusError> {
        let mut objects = self.objects();
        let properties = objects
            .get_mut(path)
            .and_then(|interfaces| interfaces.get_mut(interface))
            .ok_or_else(|| BusError::UnknownInterface {
                path: path.to_string(),
                interface: interface.to_string(),
            })?;

        if properties.get(name) != Some(&value) {
            tracing::trace!(path = %path, property = %name, value = %value, "Property changed");
            properties.insert(name.to_string(), value);
        }
        Ok(())
    }

    pub fn property(&self, path: &str, interface: &str, name: &str) -> Option<PropertyValue> {
        self.objects()
            .get(path)
            .and_then(|interfaces| interfaces.get(interface))
            .and_then(|properties| properties.get(name))
            .cloned()
    }

    pub fn interfaces(&self, path: &str) -> Vec<String> {
        self.objects()
            .get(path)
            .map(|interfaces| interfaces.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove an object and every interface on it.
    pub fn remove_object(&self, path: &str) -> Result<(), BusError> {
        match self.objects().remove(path) {
            Some(_) => {
                tracing::debug!(path = %path, "Object removed");
                Ok(())
            }
            None => Err(BusError::UnknownObject(path.to_string())),
        }
    }

    /// Published object paths, sorted.
    pub fn object_paths(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Interfaces>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Object paths are `/` or `/`-separated non-empty `[A-Za-z0-9_]` elements.
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(|element| {
            !element.is_empty() && element.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }),
        None => false,
    }
}
