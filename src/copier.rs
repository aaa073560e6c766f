//! Unconditional recursive tree copy
//!
//! Used by the full snapshot builder and by the comparator whenever a
//! directory has no reference counterpart. Every visited entry passes the
//! [`PermissionGate`] before anything is written; files keep their mtime and
//! recreated directories get the source directory's mtime once all of their
//! children are in place.

use crate::error::{from_walk_error, is_dangling_link, BackupError, Result};
use crate::permission::PermissionGate;
use crate::types::{CopyStats, EntryKind};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Copies whole trees without comparing against anything
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeCopier {
    gate: PermissionGate,
}

impl TreeCopier {
    /// Create a copier that checks entries with `gate`
    pub fn new(gate: PermissionGate) -> Self {
        Self { gate }
    }

    /// Copy everything below `source` into the existing directory `destination`
    ///
    /// The walk is depth-first in filesystem enumeration order. Nothing may
    /// already exist at any destination path; `destination` itself is left
    /// with whatever mtime it has.
    pub fn copy_contents(&self, source: &Path, destination: &Path, stats: &mut CopyStats) -> Result<()> {
        let mut directory_times: Vec<(PathBuf, SystemTime)> = Vec::new();

        for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_dangling_link(&err) => {
                    debug!("Skipping dangling symlink {:?}", err.path());
                    stats.entries_skipped += 1;
                    continue;
                }
                Err(err) => return Err(from_walk_error(err)),
            };
            let info = self.gate.readable(entry.path())?;

            let relative = entry.path().strip_prefix(source).map_err(|_| {
                BackupError::internal(format!("{:?} is not under {:?}", entry.path(), source))
            })?;
            let target = destination.join(relative);

            match info.kind {
                EntryKind::File => {
                    stats.bytes_copied += utils::copy_file_preserving_mtime(entry.path(), &target, false)?;
                    stats.files_copied += 1;
                }
                EntryKind::Directory => {
                    fs::create_dir(&target)?;
                    trace!("Created directory {:?}", target);
                    stats.directories_created += 1;
                    directory_times.push((target, info.modified));
                }
                EntryKind::Other => {
                    debug!("Skipping special file {:?}", entry.path());
                    stats.entries_skipped += 1;
                }
            }
        }

        // Pre-order walk, so reversing stamps children before their parents
        for (dir, modified) in directory_times.into_iter().rev() {
            utils::set_mtime(&dir, modified)?;
        }

        Ok(())
    }

    /// Recreate the directory `source` at `destination` with all its contents
    ///
    /// Missing parents of `destination` are created.
    pub fn copy_tree(&self, source: &Path, destination: &Path, stats: &mut CopyStats) -> Result<()> {
        let info = self.gate.readable(source)?;
        if !info.is_dir() {
            return Err(BackupError::NotADirectory {
                path: source.to_path_buf(),
            });
        }

        debug!("Copying new subtree {:?} -> {:?}", source, destination);
        fs::create_dir_all(destination)?;
        stats.directories_created += 1;

        self.copy_contents(source, destination, stats)?;
        utils::set_mtime(destination, info.modified)?;

        Ok(())
    }
}
