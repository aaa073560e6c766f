//! Disk-space guard
//!
//! Before a snapshot directory is created, the total size of regular files in
//! the source tree is compared with the free space of the destination volume.
//! Incremental runs are sized the same way even though they usually copy far
//! less; the estimate only ever errs on the high side.

use crate::error::{from_walk_error, is_dangling_link, BackupError, Result};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Source of free-space figures for a volume
pub trait SpaceProbe: Debug + Send + Sync {
    /// Bytes available to this process on the volume holding `path`
    fn available_space(&self, path: &Path) -> Result<u64>;
}

/// Queries the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeSpace;

impl SpaceProbe for VolumeSpace {
    fn available_space(&self, path: &Path) -> Result<u64> {
        Ok(fs2::available_space(path)?)
    }
}

/// Reports a fixed amount of free space regardless of path
///
/// Useful for exercising the guard without filling a disk.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace(pub u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> Result<u64> {
        Ok(self.0)
    }
}

/// Total size in bytes of all regular files below `source`
pub fn tree_size(source: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_dangling_link(&err) => continue,
            Err(err) => return Err(from_walk_error(err)),
        };
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(from_walk_error)?.len();
        }
    }
    Ok(total)
}

/// Aborts a run whose source tree would not fit on the destination volume
#[derive(Debug, Clone)]
pub struct DiskSpaceGuard {
    probe: Arc<dyn SpaceProbe>,
}

impl Default for DiskSpaceGuard {
    fn default() -> Self {
        Self::new(Arc::new(VolumeSpace))
    }
}

impl DiskSpaceGuard {
    /// Create a guard that asks `probe` for free space
    pub fn new(probe: Arc<dyn SpaceProbe>) -> Self {
        Self { probe }
    }

    /// Fail with [`BackupError::InsufficientSpace`] if `source` does not fit on `destination`
    ///
    /// # Returns
    ///
    /// The computed source size.
    pub fn ensure_fits(&self, source: &Path, destination: &Path) -> Result<u64> {
        let required = tree_size(source)?;
        let available = self.probe.available_space(destination)?;
        debug!("Source needs {} bytes, destination has {} bytes free", required, available);

        if required > available {
            return Err(BackupError::InsufficientSpace {
                path: destination.to_path_buf(),
                required,
                available,
            });
        }
        Ok(required)
    }
}
