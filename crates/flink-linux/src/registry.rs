//! Registry of open flink device files
//!
//! A flink device file may only be opened once per process: two handles
//! would each cache their own subdevice selection and silently undo each
//! other's selects. Every [`LinuxFlink`](crate::LinuxFlink) holds a
//! [`DeviceClaim`] from the registry it was opened with; the claim is
//! released when the device is dropped.

use crate::error::{LinuxFlinkError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of device paths currently open, shared between clones
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    open: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // the set stays consistent even if a holder panicked
        self.open.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registry key for `path`: the canonical path when it exists, so
    /// symlinks to the same device collide
    fn key(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }

    /// Claim `path`, failing if it is already claimed
    pub fn claim(&self, path: &Path) -> Result<DeviceClaim> {
        let key = Self::key(path);
        if !self.lock().insert(key.clone()) {
            return Err(LinuxFlinkError::AlreadyOpen {
                path: path.display().to_string(),
            });
        }
        log::debug!("linux_flink: claimed {}", key.display());
        Ok(DeviceClaim {
            registry: self.clone(),
            key,
        })
    }

    /// Whether `path` is currently claimed
    pub fn is_open(&self, path: &Path) -> bool {
        self.lock().contains(&Self::key(path))
    }

    /// Number of claimed device paths
    pub fn open_count(&self) -> usize {
        self.lock().len()
    }
}

/// Exclusive use of one device path, released on drop
#[derive(Debug)]
pub struct DeviceClaim {
    registry: DeviceRegistry,
    key: PathBuf,
}

impl DeviceClaim {
    /// Claimed path (canonical if it could be resolved)
    pub fn path(&self) -> &Path {
        &self.key
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
        log::debug!("linux_flink: released {}", self.key.display());
    }
}
