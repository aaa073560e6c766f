//! Full and incremental snapshot builders
//!
//! [`BackupEngine`] is the entry point for backups. A run checks its
//! preconditions eagerly, runs the disk-space guard, makes sure the pointer
//! file exists, resolves the baseline (incremental only), creates the
//! snapshot directory and then copies.
//!
//! ## Full snapshots
//!
//! Every entry of the source tree is copied into the fresh snapshot. On
//! success the pointer file is overwritten with the snapshot's name, making it
//! the baseline for later incremental runs.
//!
//! ## Incremental snapshots
//!
//! Each top-level entry of the source is handed to the [`TreeComparator`]
//! together with its same-named counterpart in the baseline. When no baseline
//! is recorded the run degrades to a full snapshot. Incremental runs never
//! move the pointer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use backsnap::{BackupEngine, BackupMode};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = BackupEngine::new(PathBuf::from("./project"), PathBuf::from("/mnt/backups"));
//!
//! let full = engine.run(BackupMode::Full)?;
//! println!("Full snapshot {}: {} files", full.snapshot, full.stats.files_copied);
//!
//! let incremental = engine.run(BackupMode::Incremental)?;
//! println!("Incremental snapshot {} against {:?}", incremental.snapshot, incremental.baseline);
//! # Ok(())
//! # }
//! ```

use crate::comparator::{ComparePolicy, TreeComparator};
use crate::copier::TreeCopier;
use crate::error::{BackupError, Result};
use crate::permission::PermissionGate;
use crate::pointer::{BaselineStore, PointerFile};
use crate::snapshot;
use crate::space::{DiskSpaceGuard, SpaceProbe, VolumeSpace};
use crate::types::{BackupMode, BackupOptions, BackupReport, ChangeDetection, CopyStats, EntryInfo};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Builds snapshots of one source directory into one backup root
pub struct BackupEngine {
    source: PathBuf,
    backup_root: PathBuf,
    options: BackupOptions,
    gate: PermissionGate,
    space: DiskSpaceGuard,
    baseline: Box<dyn BaselineStore>,
}

impl std::fmt::Debug for BackupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupEngine")
            .field("source", &self.source)
            .field("backup_root", &self.backup_root)
            .field("options", &self.options)
            .field("baseline", &self.baseline)
            .finish()
    }
}

impl BackupEngine {
    /// Engine with default options and the pointer file inside `backup_root`
    pub fn new(source: PathBuf, backup_root: PathBuf) -> Self {
        BackupEngineBuilder::new().build(source, backup_root)
    }

    /// Start configuring an engine
    pub fn builder() -> BackupEngineBuilder {
        BackupEngineBuilder::new()
    }

    /// Directory being backed up
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory holding the snapshots and the pointer file
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Create a snapshot of the source in `mode`
    ///
    /// # Errors
    ///
    /// - [`BackupError::PathNotFound`] / [`BackupError::NotADirectory`] for bad source or root paths,
    ///   and `PathNotFound` for a recorded baseline that no longer exists
    /// - [`BackupError::PermissionDenied`] when the root is not owner-writable or any source
    ///   entry is not owner-readable
    /// - [`BackupError::InsufficientSpace`] when the guard rejects the run
    /// - [`BackupError::DestinationInsideSource`] when the root is inside the source
    ///
    /// Only the per-entry read check can fail after the snapshot directory
    /// exists; such a run leaves a partially populated snapshot behind.
    #[instrument(skip(self), fields(source = ?self.source, root = ?self.backup_root))]
    pub fn run(&self, mode: BackupMode) -> Result<BackupReport> {
        let start = Instant::now();
        info!("Starting {} backup", mode);

        self.check_preconditions()?;
        if self.options.check_space {
            self.space.ensure_fits(&self.source, &self.backup_root)?;
        }
        self.baseline.ensure()?;

        let baseline = match mode {
            BackupMode::Full => None,
            BackupMode::Incremental => self.resolve_baseline()?,
        };

        let (name, snapshot_path) = snapshot::create_snapshot_dir(&self.backup_root)?;

        let (performed, fell_back_to_full, stats) = match (mode, &baseline) {
            (BackupMode::Full, _) => (BackupMode::Full, false, self.full_snapshot(&name, &snapshot_path)?),
            (BackupMode::Incremental, None) => {
                info!("No full snapshot recorded, running a full backup instead");
                (BackupMode::Full, true, self.full_snapshot(&name, &snapshot_path)?)
            }
            (BackupMode::Incremental, Some((_, baseline_path))) => (
                BackupMode::Incremental,
                false,
                self.incremental_snapshot(baseline_path, &snapshot_path)?,
            ),
        };

        let report = BackupReport {
            snapshot: name,
            snapshot_path,
            mode: performed,
            fell_back_to_full,
            baseline: baseline.map(|(name, _)| name),
            stats,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Created {} snapshot {} in {}ms ({} files, {} copied)",
            report.mode,
            report.snapshot,
            report.duration_ms,
            report.stats.files_copied,
            utils::format_bytes(report.stats.bytes_copied)
        );

        Ok(report)
    }

    /// Shorthand for `run(BackupMode::Full)`
    pub fn full(&self) -> Result<BackupReport> {
        self.run(BackupMode::Full)
    }

    /// Shorthand for `run(BackupMode::Incremental)`
    pub fn incremental(&self) -> Result<BackupReport> {
        self.run(BackupMode::Incremental)
    }

    fn check_preconditions(&self) -> Result<()> {
        utils::require_directories(&[&self.source, &self.backup_root])?;

        self.gate.readable(&self.source)?;
        self.gate.check_writable(&EntryInfo::read(&self.backup_root)?)?;

        if utils::is_within(&self.backup_root, &self.source)? {
            return Err(BackupError::DestinationInsideSource {
                source_root: self.source.clone(),
                destination: self.backup_root.clone(),
            });
        }
        Ok(())
    }

    /// Name and path of the recorded full snapshot, if any
    fn resolve_baseline(&self) -> Result<Option<(String, PathBuf)>> {
        let Some(name) = self.baseline.read()? else {
            return Ok(None);
        };

        let path = self.backup_root.join(&name);
        if !path.is_dir() {
            return Err(BackupError::PathNotFound { path });
        }
        debug!("Incremental baseline is {}", name);
        Ok(Some((name, path)))
    }

    fn full_snapshot(&self, name: &str, snapshot_path: &Path) -> Result<CopyStats> {
        let mut stats = CopyStats::default();
        TreeCopier::new(self.gate).copy_contents(&self.source, snapshot_path, &mut stats)?;
        self.baseline.write(name)?;
        Ok(stats)
    }

    fn incremental_snapshot(&self, baseline_path: &Path, snapshot_path: &Path) -> Result<CopyStats> {
        let comparator = TreeComparator::new(
            self.gate,
            ComparePolicy::for_backup(self.options.change_detection),
        );
        let mut stats = CopyStats::default();

        for entry in fs::read_dir(&self.source)? {
            let entry = entry?;
            comparator.compare_and_copy(
                &entry.path(),
                &baseline_path.join(entry.file_name()),
                snapshot_path,
                &mut stats,
            )?;
        }
        Ok(stats)
    }
}

/// Builder for [`BackupEngine`]
///
/// # Default Values
///
/// - `change_detection`: [`ChangeDetection::MtimeAndSize`]
/// - `check_space`: true, using the real volume's free space
/// - `baseline`: `last_full.txt` inside the backup root
///
/// # Examples
///
/// ```rust,no_run
/// use backsnap::{BackupEngine, ChangeDetection};
/// use std::path::PathBuf;
///
/// let engine = BackupEngine::builder()
///     .change_detection(ChangeDetection::ContentHash)
///     .check_space(false)
///     .build(PathBuf::from("./project"), PathBuf::from("/mnt/backups"));
/// ```
#[derive(Debug)]
pub struct BackupEngineBuilder {
    options: BackupOptions,
    space_probe: Arc<dyn SpaceProbe>,
    baseline: Option<Box<dyn BaselineStore>>,
}

impl BackupEngineBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            options: BackupOptions::default(),
            space_probe: Arc::new(VolumeSpace),
            baseline: None,
        }
    }

    /// Replace all options at once
    pub fn options(mut self, options: BackupOptions) -> Self {
        self.options = options;
        self
    }

    /// Set how changed files are detected in incremental runs
    pub fn change_detection(mut self, detection: ChangeDetection) -> Self {
        self.options.change_detection = detection;
        self
    }

    /// Enable or disable the disk-space guard
    pub fn check_space(mut self, enabled: bool) -> Self {
        self.options.check_space = enabled;
        self
    }

    /// Use `probe` instead of the operating system for free-space figures
    pub fn space_probe(mut self, probe: Arc<dyn SpaceProbe>) -> Self {
        self.space_probe = probe;
        self
    }

    /// Keep the baseline record somewhere other than `last_full.txt`
    pub fn baseline_store(mut self, store: Box<dyn BaselineStore>) -> Self {
        self.baseline = Some(store);
        self
    }

    /// Build the engine
    pub fn build(self, source: PathBuf, backup_root: PathBuf) -> BackupEngine {
        let baseline = self
            .baseline
            .unwrap_or_else(|| Box::new(PointerFile::in_root(&backup_root)));

        BackupEngine {
            source,
            backup_root,
            options: self.options,
            gate: PermissionGate::new(),
            space: DiskSpaceGuard::new(self.space_probe),
            baseline,
        }
    }
}

impl Default for BackupEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
