//! Owner permission checks
//!
//! The gate inspects the owner's permission bits rather than attempting the
//! access, so the outcome does not depend on who runs the process. A failed
//! check is fatal for the whole run.

use crate::error::{BackupError, Result};
use crate::types::EntryInfo;
use std::path::Path;
use tracing::trace;

/// Checks owner read/write bits before an entry is touched
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionGate;

impl PermissionGate {
    /// Create a new gate
    pub fn new() -> Self {
        Self
    }

    /// Whether the owner lacks read permission on `path`
    pub fn lacks_read(&self, path: &Path) -> Result<bool> {
        Ok(!EntryInfo::read(path)?.owner_readable)
    }

    /// Fail with a read denial unless the owner can read `entry`
    pub fn check_readable(&self, entry: &EntryInfo) -> Result<()> {
        if !entry.owner_readable {
            trace!("Owner read bit missing on {:?}", entry.path);
            return Err(BackupError::unreadable(&entry.path));
        }
        Ok(())
    }

    /// Fail with a write denial unless the owner can write `entry`
    pub fn check_writable(&self, entry: &EntryInfo) -> Result<()> {
        if !entry.owner_writable {
            trace!("Owner write bit missing on {:?}", entry.path);
            return Err(BackupError::unwritable(&entry.path));
        }
        Ok(())
    }

    /// Read `path` and require the owner read bit
    pub fn readable(&self, path: &Path) -> Result<EntryInfo> {
        let entry = EntryInfo::read(path)?;
        self.check_readable(&entry)?;
        Ok(entry)
    }
}
