//! Snapshot naming and discovery
//!
//! Snapshots are directories directly under a backup root, named by their
//! creation time in local time as `YYYY-MM-DD-HH-MM-SS`. When two snapshots
//! are requested within the same second the later one gets a numeric
//! suffix (`-1`, `-2`, ...), so names never collide and still sort by time.

use crate::error::{BackupError, Result};
use crate::pointer::BaselineStore;
use crate::types::SnapshotInfo;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// `chrono` format string for snapshot names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Length of a bare timestamp name
const TIMESTAMP_LEN: usize = 19;

/// Upper bound on same-second suffixes before giving up
const MAX_SUFFIX: u32 = 10_000;

/// Format `time` as a snapshot name
pub fn snapshot_name<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Create a new snapshot directory under `backup_root` named after the current local time
///
/// # Returns
///
/// The directory name and its full path.
pub fn create_snapshot_dir(backup_root: &Path) -> Result<(String, PathBuf)> {
    create_snapshot_dir_at(backup_root, &Local::now())
}

/// Create a snapshot directory for `time`, disambiguating same-second names
pub fn create_snapshot_dir_at<Tz: TimeZone>(backup_root: &Path, time: &DateTime<Tz>) -> Result<(String, PathBuf)>
where
    Tz::Offset: std::fmt::Display,
{
    let base = snapshot_name(time);

    for attempt in 0..=MAX_SUFFIX {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, attempt)
        };
        let path = backup_root.join(&name);

        match fs::create_dir(&path) {
            Ok(()) => {
                debug!("Created snapshot directory {:?}", path);
                return Ok((name, path));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                trace!("Snapshot name {} taken", name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(BackupError::internal(format!(
        "no free snapshot name for {} under {:?}",
        base, backup_root
    )))
}

/// Whether `name` looks like a snapshot directory name
pub fn is_snapshot_name(name: &str) -> bool {
    let Some(stamp) = name.get(..TIMESTAMP_LEN) else {
        return false;
    };
    if NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_err() {
        return false;
    }

    match &name[TIMESTAMP_LEN..] {
        "" => true,
        rest => rest
            .strip_prefix('-')
            .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false),
    }
}

/// List the snapshots under `backup_root`, oldest first
///
/// Entries whose names do not look like snapshots are ignored. The snapshot
/// named by `baseline` is flagged.
pub fn list_snapshots(backup_root: &Path, baseline: &dyn BaselineStore) -> Result<Vec<SnapshotInfo>> {
    if !backup_root.exists() {
        return Err(BackupError::PathNotFound {
            path: backup_root.to_path_buf(),
        });
    }
    if !backup_root.is_dir() {
        return Err(BackupError::NotADirectory {
            path: backup_root.to_path_buf(),
        });
    }

    let current = baseline.read()?;
    let mut snapshots = Vec::new();

    for entry in fs::read_dir(backup_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_snapshot_name(&name) {
            continue;
        }
        snapshots.push(SnapshotInfo {
            is_baseline: current.as_deref() == Some(name.as_str()),
            path: entry.path(),
            name,
        });
    }

    // Suffixed names sort after their bare timestamp; compare suffixes numerically
    snapshots.sort_by_key(|s| sort_key(&s.name));
    Ok(snapshots)
}

fn sort_key(name: &str) -> (String, u32) {
    let (stamp, rest) = name.split_at(TIMESTAMP_LEN.min(name.len()));
    let suffix = rest.trim_start_matches('-').parse().unwrap_or(0);
    (stamp.to_string(), suffix)
}
