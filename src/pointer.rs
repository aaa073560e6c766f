//! Record of the current incremental baseline
//!
//! A backup root carries one plain-text file, `last_full.txt`, whose single
//! line is the directory name of the latest full snapshot. Builders reach it
//! only through the [`BaselineStore`] trait: reads return an optional name,
//! writes replace the whole record.

use crate::error::Result;
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the pointer inside a backup root
pub const POINTER_FILE_NAME: &str = "last_full.txt";

/// Persistent "last full snapshot" record
pub trait BaselineStore: std::fmt::Debug {
    /// Create an empty record if none exists yet
    fn ensure(&self) -> Result<()>;

    /// Name of the latest full snapshot, or `None` when nothing is recorded
    fn read(&self) -> Result<Option<String>>;

    /// Replace the record with `snapshot`
    fn write(&self, snapshot: &str) -> Result<()>;
}

/// [`BaselineStore`] backed by `last_full.txt` in a backup root
#[derive(Debug, Clone)]
pub struct PointerFile {
    path: PathBuf,
}

impl PointerFile {
    /// Pointer file inside `backup_root`
    pub fn in_root(backup_root: &Path) -> Self {
        Self {
            path: backup_root.join(POINTER_FILE_NAME),
        }
    }

    /// Location of the pointer file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BaselineStore for PointerFile {
    fn ensure(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("Creating empty pointer file {:?}", self.path);
            fs::write(&self.path, b"")?;
        }
        Ok(())
    }

    fn read(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let name = content.lines().next().unwrap_or("").trim_end_matches('\r');
        if name.is_empty() {
            Ok(None)
        } else {
            Ok(Some(name.to_string()))
        }
    }

    fn write(&self, snapshot: &str) -> Result<()> {
        debug!("Recording {} as the last full snapshot", snapshot);
        utils::atomic_write(&self.path, snapshot.as_bytes())
    }
}
