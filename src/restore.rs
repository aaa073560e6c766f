//! Restoring a snapshot onto a directory
//!
//! The restore walks the top-level entries of a snapshot and hands each to
//! the [`TreeComparator`] with the live target as both reference and
//! destination. Entries missing from the target are created, changed ones are
//! overwritten with the snapshot's version, and anything only present in the
//! target is left alone.

use crate::comparator::{ComparePolicy, TreeComparator};
use crate::error::{BackupError, Result};
use crate::permission::PermissionGate;
use crate::types::{ChangeDetection, CopyStats, EntryInfo, RestoreReport};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument};

/// Restores one snapshot directory onto one target directory
#[derive(Debug, Clone)]
pub struct RestoreEngine {
    snapshot: PathBuf,
    target: PathBuf,
    change_detection: ChangeDetection,
    gate: PermissionGate,
}

impl RestoreEngine {
    /// Engine using the default mtime+size change detection
    pub fn new(snapshot: PathBuf, target: PathBuf) -> Self {
        Self::with_change_detection(snapshot, target, ChangeDetection::default())
    }

    /// Engine using `change_detection` to decide which target files to overwrite
    pub fn with_change_detection(snapshot: PathBuf, target: PathBuf, change_detection: ChangeDetection) -> Self {
        Self {
            snapshot,
            target,
            change_detection,
            gate: PermissionGate::new(),
        }
    }

    /// Snapshot being restored
    pub fn snapshot(&self) -> &Path {
        &self.snapshot
    }

    /// Directory restored onto
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Run the restore
    ///
    /// # Errors
    ///
    /// - `PathNotFound` / `NotADirectory` when either path is unusable
    /// - `PermissionDenied` when the target is not owner-writable or a snapshot entry is not
    ///   owner-readable
    /// - `DestinationInsideSource` when the target lies inside the snapshot
    ///
    /// A failure part-way leaves the entries restored so far in place.
    #[instrument(skip(self), fields(snapshot = ?self.snapshot, target = ?self.target))]
    pub fn run(&self) -> Result<RestoreReport> {
        let start = Instant::now();
        info!("Starting restore");

        utils::require_directories(&[&self.snapshot, &self.target])?;
        self.gate.readable(&self.snapshot)?;
        self.gate.check_writable(&EntryInfo::read(&self.target)?)?;

        if utils::is_within(&self.target, &self.snapshot)? {
            return Err(BackupError::DestinationInsideSource {
                source_root: self.snapshot.clone(),
                destination: self.target.clone(),
            });
        }

        let comparator = TreeComparator::new(self.gate, ComparePolicy::for_restore(self.change_detection));
        let mut stats = CopyStats::default();

        for entry in fs::read_dir(&self.snapshot)? {
            let entry = entry?;
            comparator.compare_and_copy(
                &entry.path(),
                &self.target.join(entry.file_name()),
                &self.target,
                &mut stats,
            )?;
        }

        let report = RestoreReport {
            source: self.snapshot.clone(),
            target: self.target.clone(),
            stats,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Restored {} files ({}) in {}ms, {} entries unchanged",
            report.stats.files_copied,
            utils::format_bytes(report.stats.bytes_copied),
            report.duration_ms,
            report.stats.entries_skipped
        );

        Ok(report)
    }
}
