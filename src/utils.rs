//! Utility functions for backsnap
//!
//! ## Categories of Utilities
//!
//! ### File Operations
//! - Copying a file while carrying its modification time across
//! - Stamping directory modification times
//! - Atomic file writing
//! - File content hashing (SHA-256)
//!
//! ### Path Manipulation
//! - Testing whether one path lies inside another
//!
//! ### Formatting
//! - Human-readable byte counts
//!
//! All functions return `Result<T, BackupError>`.

use crate::error::{BackupError, Result};
use filetime::FileTime;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;
use tracing::trace;

/// Hash a file's content using SHA-256
///
/// Streams the file through an 8KB buffer and returns the digest as a
/// 64-character hexadecimal string.
pub fn hash_file_content(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Copy a regular file and give the copy the source's modification time
///
/// With `overwrite == false` an existing destination is an error
/// ([`std::io::ErrorKind::AlreadyExists`]); with `overwrite == true` it is
/// replaced.
///
/// # Returns
///
/// Number of bytes copied.
pub fn copy_file_preserving_mtime(source: &Path, destination: &Path, overwrite: bool) -> Result<u64> {
    if !overwrite && fs::symlink_metadata(destination).is_ok() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        )
        .into());
    }

    let metadata = fs::metadata(source)?;
    let bytes = fs::copy(source, destination)?;
    filetime::set_file_mtime(destination, FileTime::from_last_modification_time(&metadata))?;

    trace!("Copied {:?} -> {:?} ({} bytes)", source, destination, bytes);
    Ok(bytes)
}

/// Set the modification time of `path`
pub fn set_mtime(path: &Path, modified: SystemTime) -> Result<()> {
    filetime::set_file_mtime(path, FileTime::from_system_time(modified))?;
    Ok(())
}

/// Require every path to exist and be a directory
///
/// Existence is checked for all paths before any type check, so a missing
/// path is always reported as [`BackupError::PathNotFound`] first.
pub fn require_directories(paths: &[&Path]) -> Result<()> {
    if let Some(missing) = paths.iter().find(|p| !p.exists()) {
        return Err(BackupError::PathNotFound {
            path: missing.to_path_buf(),
        });
    }
    if let Some(not_dir) = paths.iter().find(|p| !p.is_dir()) {
        return Err(BackupError::NotADirectory {
            path: not_dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Whether `inner` is `outer` or lies somewhere beneath it
///
/// Both paths are canonicalized, so they must exist.
pub fn is_within(inner: &Path, outer: &Path) -> Result<bool> {
    let inner = fs::canonicalize(inner)?;
    let outer = fs::canonicalize(outer)?;
    Ok(inner.starts_with(outer))
}

/// Format bytes as human-readable string
///
/// Uses binary units (1024-based); values below 1 KB are whole numbers.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Atomic file write (write to temp file then rename)
///
/// The target is either the old content or the complete new content, never
/// a partial write.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}
