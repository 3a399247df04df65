//! Device stream handle for the SMBus binding.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::hw::HwError;

/// An unopened-until-assigned handle on a device node.
///
/// Created by the binding factory and opened by the binding during
/// initialization; the file is closed when the descriptor is dropped.
#[derive(Debug, Default)]
pub struct StreamDescriptor {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl StreamDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` read/write and bind it to this descriptor.
    pub fn assign(&mut self, path: &Path) -> Result<(), HwError> {
        if self.file.is_some() {
            return Err(HwError::AlreadyInitialized("stream descriptor"));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| HwError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Stream descriptor opened");
        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the underlying file, if any.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!(path = ?self.path, "Stream descriptor closed");
        }
    }
}

impl Drop for StreamDescriptor {
    fn drop(&mut self) {
        self.close();
    }
}
