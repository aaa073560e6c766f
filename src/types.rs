//! Core data types used throughout backsnap
//!
//! ## Overview
//!
//! - **Filesystem state**: [`EntryKind`], [`EntryInfo`] - the attributes the comparator reasons about
//! - **Operations**: [`BackupMode`], [`ChangeDetection`], [`BackupOptions`] - what to run and how
//! - **Results**: [`CopyStats`], [`BackupReport`], [`RestoreReport`], [`SnapshotInfo`]
//!
//! ## Examples
//!
//! ```rust
//! use backsnap::types::{BackupMode, BackupOptions, ChangeDetection};
//!
//! let mode: BackupMode = "incremental".parse().unwrap();
//! assert_eq!(mode, BackupMode::Incremental);
//!
//! let options = BackupOptions {
//!     change_detection: ChangeDetection::ContentHash,
//!     ..Default::default()
//! };
//! assert!(options.check_space);
//! ```

use crate::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// Kind of a filesystem entry as seen through symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Sockets, FIFOs, devices; never copied
    Other,
}

/// Snapshot of the attributes of one filesystem entry
///
/// Metadata is read through symlinks, so a link to a file is treated as that
/// file.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Path of the entry
    pub path: PathBuf,
    /// File, directory or other
    pub kind: EntryKind,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Owner read bit
    pub owner_readable: bool,
    /// Owner write bit
    pub owner_writable: bool,
}

impl EntryInfo {
    /// Read the attributes of `path`
    ///
    /// Returns `Ok(None)` when nothing exists at `path`, so callers can treat
    /// an absent reference as a normal case. A symlink whose target is gone
    /// still exists and comes back as [`EntryKind::Other`].
    pub fn probe(path: &Path) -> Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(Self::from_metadata(path, &metadata)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => match fs::symlink_metadata(path) {
                Ok(link) => Ok(Some(Self::from_metadata(path, &link)?)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`EntryInfo::probe`] but a missing path is an error
    pub fn read(path: &Path) -> Result<Self> {
        Self::probe(path)?.ok_or_else(|| BackupError::PathNotFound {
            path: path.to_path_buf(),
        })
    }

    fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Result<Self> {
        let kind = if metadata.is_file() {
            EntryKind::File
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        };
        let (owner_readable, owner_writable) = owner_bits(metadata);

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            size: metadata.len(),
            modified: metadata.modified()?,
            owner_readable,
            owner_writable,
        })
    }

    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[cfg(unix)]
fn owner_bits(metadata: &fs::Metadata) -> (bool, bool) {
    use std::os::unix::fs::PermissionsExt;
    let mode = metadata.permissions().mode();
    (mode & 0o400 != 0, mode & 0o200 != 0)
}

#[cfg(not(unix))]
fn owner_bits(metadata: &fs::Metadata) -> (bool, bool) {
    // Only the read-only attribute is visible here
    (true, !metadata.permissions().readonly())
}

/// Kind of snapshot to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    /// Unconditional copy of the whole source tree
    Full,
    /// Only entries changed since the last full snapshot
    Incremental,
}

impl FromStr for BackupMode {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(BackupMode::Full),
            "incremental" => Ok(BackupMode::Incremental),
            other => Err(BackupError::InvalidMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for BackupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupMode::Full => f.write_str("full"),
            BackupMode::Incremental => f.write_str("incremental"),
        }
    }
}

/// How the comparator decides that a file with a reference counterpart changed
///
/// The default is a heuristic, not a correctness guarantee: a same-size edit
/// that keeps its mtime, or a touch without a size change, counts as
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeDetection {
    /// Changed only when both the mtime and the size differ
    #[default]
    MtimeAndSize,
    /// Changed when the SHA-256 of the contents differs
    ContentHash,
}

/// Options shared by backup and restore runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupOptions {
    /// File-level change detection
    pub change_detection: ChangeDetection,
    /// Run the disk-space guard before creating a snapshot
    pub check_space: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            change_detection: ChangeDetection::default(),
            check_space: true,
        }
    }
}

/// Counters accumulated while copying a tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStats {
    /// Regular files written
    pub files_copied: usize,
    /// Bytes written for those files
    pub bytes_copied: u64,
    /// Directories created at the destination
    pub directories_created: usize,
    /// Unchanged files and directories that were left alone
    pub entries_skipped: usize,
}

impl CopyStats {
    /// Check whether anything was written
    pub fn has_changes(&self) -> bool {
        self.files_copied > 0 || self.directories_created > 0
    }
}

/// Result of a backup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    /// Directory name of the snapshot under the backup root
    pub snapshot: String,
    /// Full path of the snapshot
    pub snapshot_path: PathBuf,
    /// Mode that was actually performed
    pub mode: BackupMode,
    /// Incremental request degraded to full because no baseline was recorded
    pub fell_back_to_full: bool,
    /// Full snapshot the incremental run compared against
    pub baseline: Option<String>,
    /// Copy counters
    pub stats: CopyStats,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Result of a restore run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Snapshot that was restored
    pub source: PathBuf,
    /// Directory restored onto
    pub target: PathBuf,
    /// Copy counters
    pub stats: CopyStats,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// A snapshot directory found under a backup root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Directory name
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Named by the pointer file as the current incremental baseline
    pub is_baseline: bool,
}
