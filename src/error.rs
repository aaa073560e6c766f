//! Error types for backsnap
//!
//! Every failure in a backup or restore run is fatal: errors propagate
//! straight up to the caller and only the binary turns them into an exit
//! code. The variants map onto a small set of categories (see
//! [`ErrorCategory`]) that scripts can rely on, while the display text stays
//! free to change.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the backsnap library
pub type Result<T> = std::result::Result<T, BackupError>;

/// Which owner permission bit was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Owner read bit
    Read,
    /// Owner write bit
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Coarse classification of a [`BackupError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Source, destination or baseline path does not exist
    PathNotFound,
    /// Path exists but is not a directory
    NotADirectory,
    /// Owner read or write permission is missing
    PermissionDenied,
    /// Destination volume cannot hold the source tree
    InsufficientSpace,
    /// Backup mode is neither `full` nor `incremental`
    InvalidMode,
    /// Paths are individually valid but cannot be combined
    InvalidConfiguration,
    /// Underlying filesystem failure
    Io,
}

/// Main error type for all backsnap operations
#[derive(Debug, Error)]
pub enum BackupError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization of reports
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory walk error from the walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A required path does not exist
    #[error("Path not found: {path:?}")]
    PathNotFound {
        /// Path that was expected to exist
        path: PathBuf,
    },

    /// A path exists but is not a directory
    #[error("Not a directory: {path:?}")]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// Owner permission bit missing on an entry
    #[error("Permission denied ({access}): {path:?}")]
    PermissionDenied {
        /// Entry that failed the check
        path: PathBuf,
        /// The missing permission
        access: Access,
    },

    /// Source tree does not fit on the destination volume
    #[error("Insufficient space on {path:?}: {required} bytes required, {available} bytes available")]
    InsufficientSpace {
        /// Destination path whose volume was queried
        path: PathBuf,
        /// Total size of regular files in the source tree
        required: u64,
        /// Free space reported for the destination volume
        available: u64,
    },

    /// Unknown backup mode
    #[error("Invalid backup mode: {0:?} (expected \"full\" or \"incremental\")")]
    InvalidMode(String),

    /// Destination would be written inside the tree being copied
    #[error("Destination {destination:?} lies inside source {source_root:?}")]
    DestinationInsideSource {
        /// Tree being copied (backup source or snapshot)
        source_root: PathBuf,
        /// Backup root or restore target
        destination: PathBuf,
    },

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackupError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        BackupError::Internal(msg.into())
    }

    /// Read permission failure for `path`
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        BackupError::PermissionDenied {
            path: path.into(),
            access: Access::Read,
        }
    }

    /// Write permission failure for `path`
    pub fn unwritable(path: impl Into<PathBuf>) -> Self {
        BackupError::PermissionDenied {
            path: path.into(),
            access: Access::Write,
        }
    }

    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackupError::PathNotFound { .. } => ErrorCategory::PathNotFound,
            BackupError::NotADirectory { .. } => ErrorCategory::NotADirectory,
            BackupError::PermissionDenied { .. } => ErrorCategory::PermissionDenied,
            BackupError::InsufficientSpace { .. } => ErrorCategory::InsufficientSpace,
            BackupError::InvalidMode(_) => ErrorCategory::InvalidMode,
            BackupError::DestinationInsideSource { .. } => ErrorCategory::InvalidConfiguration,
            BackupError::Io(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCategory::PermissionDenied
            }
            BackupError::Io(_)
            | BackupError::WalkDir(_)
            | BackupError::Json(_)
            | BackupError::Internal(_) => ErrorCategory::Io,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            BackupError::PathNotFound { path } => {
                format!("{:?} does not exist. Check the path or create the directory first.", path)
            }
            BackupError::NotADirectory { path } => {
                format!("{:?} is not a directory. Both paths must point to directories.", path)
            }
            BackupError::PermissionDenied { path, access: Access::Read } => {
                format!("{:?} is not readable by its owner. Fix the file permissions and try again.", path)
            }
            BackupError::PermissionDenied { path, access: Access::Write } => {
                format!("{:?} is not writable by its owner. Cannot create entries inside it.", path)
            }
            BackupError::InsufficientSpace { required, available, .. } => {
                format!(
                    "Not enough free space: the source needs {} but only {} is available. Free up space and try again.",
                    crate::utils::format_bytes(*required),
                    crate::utils::format_bytes(*available)
                )
            }
            BackupError::InvalidMode(mode) => {
                format!("Unknown mode {:?}. Choose either 'full' or 'incremental'.", mode)
            }
            _ => self.to_string(),
        }
    }
}

/// Convert a walk failure into the error the rest of the crate expects
///
/// Permission failures during enumeration surface as read denials on the
/// entry that could not be opened.
pub(crate) fn from_walk_error(err: walkdir::Error) -> BackupError {
    let denied = match err.io_error() {
        Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            err.path().map(|p| p.to_path_buf())
        }
        _ => None,
    };
    match denied {
        Some(path) => BackupError::unreadable(path),
        None => BackupError::WalkDir(err),
    }
}

/// Whether a walk failed on a symlink whose target no longer exists
pub(crate) fn is_dangling_link(err: &walkdir::Error) -> bool {
    let missing = err
        .io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
    missing
        && err
            .path()
            .and_then(|p| std::fs::symlink_metadata(p).ok())
            .is_some_and(|m| m.file_type().is_symlink())
}
