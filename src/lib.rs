//! # backsnap - timestamped directory snapshots
//!
//! Copies a source directory into a backup root as either a full snapshot or
//! an incremental snapshot holding only what changed since the last full one,
//! and restores any snapshot back onto a directory.
//!
//! ## Overview
//!
//! A backup root looks like this:
//!
//! ```text
//! /mnt/backups/
//! ├── last_full.txt            <- name of the latest full snapshot
//! ├── 2024-03-09-07-05-03/     <- full snapshot
//! └── 2024-03-10-07-05-11/     <- incremental snapshot
//! ```
//!
//! - **Full snapshots** copy every entry and become the new baseline.
//! - **Incremental snapshots** compare each entry with the baseline and copy
//!   what changed. A file counts as changed when both its mtime and its size
//!   differ; a directory whose mtime matches is skipped with its whole
//!   subtree. Opt into [`ChangeDetection::ContentHash`] for a content-based
//!   file check.
//! - **Restores** run the same comparison against the target directory and
//!   let the snapshot win. Nothing is ever deleted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backsnap::{BackupEngine, BackupMode, RestoreEngine};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = BackupEngine::new(PathBuf::from("./project"), PathBuf::from("/mnt/backups"));
//! let report = engine.run(BackupMode::Full)?;
//!
//! // ... files change ...
//! engine.run(BackupMode::Incremental)?;
//!
//! RestoreEngine::new(report.snapshot_path, PathBuf::from("./project")).run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, BackupError>`. Every error is fatal for
//! the run; [`BackupError::category`] groups them for callers that only care
//! about the kind of failure.
//!
//! ## Module Organization
//!
//! - [`backup`]: full and incremental snapshot builders
//! - [`restore`]: restoring a snapshot onto a directory
//! - [`comparator`]: the recursive diff-and-copy core
//! - [`copier`]: unconditional tree copy
//! - [`permission`]: owner read/write checks
//! - [`pointer`]: the `last_full.txt` baseline record
//! - [`snapshot`]: snapshot naming and listing
//! - [`space`]: disk-space guard
//! - [`types`]: shared data types
//! - [`error`]: error types

pub mod backup;
pub mod comparator;
pub mod copier;
pub mod error;
pub mod permission;
pub mod pointer;
pub mod restore;
pub mod snapshot;
pub mod space;
pub mod types;

mod utils;

pub use backup::{BackupEngine, BackupEngineBuilder};
pub use comparator::{ComparePolicy, TreeComparator};
pub use error::{Access, BackupError, ErrorCategory, Result};
pub use pointer::{BaselineStore, PointerFile, POINTER_FILE_NAME};
pub use restore::RestoreEngine;
pub use snapshot::list_snapshots;
pub use space::{DiskSpaceGuard, FixedSpace, SpaceProbe, VolumeSpace};
pub use types::*;
pub use utils::format_bytes;
