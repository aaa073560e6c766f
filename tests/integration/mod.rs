//! Integration tests for backsnap
//!
//! Runs sequences of full, incremental and restore operations against real
//! directories and checks what each snapshot ends up holding.

use ::backsnap::*;
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tracing::info;

/// Test harness owning a source tree and a backup root
pub struct BackupTestHarness {
    pub source_dir: TempDir,
    pub backup_dir: TempDir,
    pub engine: BackupEngine,
}

impl BackupTestHarness {
    /// Harness with default options
    pub fn new() -> Self {
        Self::with_detection(ChangeDetection::MtimeAndSize)
    }

    /// Harness comparing files with `detection`
    pub fn with_detection(detection: ChangeDetection) -> Self {
        let source_dir = TempDir::new().unwrap();
        let backup_dir = TempDir::new().unwrap();

        let engine = BackupEngine::builder()
            .change_detection(detection)
            .build(
                source_dir.path().to_path_buf(),
                backup_dir.path().to_path_buf(),
            );

        Self {
            source_dir,
            backup_dir,
            engine,
        }
    }

    pub fn source(&self) -> &Path {
        self.source_dir.path()
    }

    pub fn root(&self) -> &Path {
        self.backup_dir.path()
    }

    /// Write a file under the source and pin its mtime
    pub fn write(&self, rel: &str, content: &str, mtime_secs: u64) -> PathBuf {
        let path = self.source().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        pin_mtime(&path, mtime_secs);
        path
    }

    /// Create a directory under the source and pin its mtime
    pub fn mkdir(&self, rel: &str, mtime_secs: u64) -> PathBuf {
        let path = self.source().join(rel);
        fs::create_dir_all(&path).unwrap();
        pin_mtime(&path, mtime_secs);
        path
    }

    /// Write several files at once with the same mtime
    pub fn populate(&self, files: &[(&str, &str)], mtime_secs: u64) -> anyhow::Result<()> {
        for (rel, content) in files {
            let path = self.source().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs as i64, 0))?;
        }
        Ok(())
    }

    pub fn pointer(&self) -> Option<String> {
        PointerFile::in_root(self.root()).read().unwrap()
    }

    /// Snapshot directories currently under the root
    pub fn snapshot_names(&self) -> Vec<String> {
        list_snapshots(self.root(), &PointerFile::in_root(self.root()))
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect()
    }
}

pub fn pin_mtime(path: &Path, secs: u64) {
    let time = UNIX_EPOCH + Duration::from_secs(secs);
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

/// Relative paths of every regular file under `root`, with contents
pub fn file_map(root: &Path) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_full_snapshot_preserves_mtimes() {
    let harness = BackupTestHarness::new();
    harness.write("sub/deep/file.txt", "deep", 1_500);
    harness.write("top.txt", "top", 1_200);
    pin_mtime(&harness.source().join("sub/deep"), 1_100);
    pin_mtime(&harness.source().join("sub"), 1_000);

    let report = harness.engine.full().unwrap();
    let snap = &report.snapshot_path;

    assert_eq!(mtime(&snap.join("top.txt")), mtime(&harness.source().join("top.txt")));
    assert_eq!(mtime(&snap.join("sub/deep/file.txt")), mtime(&harness.source().join("sub/deep/file.txt")));
    assert_eq!(mtime(&snap.join("sub/deep")), mtime(&harness.source().join("sub/deep")));
    assert_eq!(mtime(&snap.join("sub")), mtime(&harness.source().join("sub")));
    assert_eq!(report.stats.files_copied, 2);
    assert_eq!(report.stats.directories_created, 2);
}

#[test]
fn test_new_file_in_touched_directory() {
    let harness = BackupTestHarness::new();
    harness.write("sub/old.txt", "old", 1_000);
    harness.mkdir("sub", 1_000);
    harness.engine.full().unwrap();

    // Adding a file changes the directory mtime
    harness.write("sub/new.txt", "new", 2_000);
    pin_mtime(&harness.source().join("sub"), 2_000);

    let report = harness.engine.incremental().unwrap();
    info!("Incremental snapshot {}", report.snapshot);

    assert_eq!(
        file_map(&report.snapshot_path),
        vec![("sub/new.txt".to_string(), "new".to_string())]
    );
    assert_eq!(report.stats.files_copied, 1);
}

#[test]
fn test_change_below_untouched_directory_is_missed() {
    let harness = BackupTestHarness::new();
    harness.write("sub/file.txt", "v1", 1_000);
    harness.mkdir("sub", 1_000);
    harness.engine.full().unwrap();

    // Editing a file in place does not bump its parent's mtime
    harness.write("sub/file.txt", "version two", 2_000);
    pin_mtime(&harness.source().join("sub"), 1_000);

    let report = harness.engine.incremental().unwrap();

    assert!(file_map(&report.snapshot_path).is_empty());
    assert_eq!(report.stats.entries_skipped, 1);
}

#[test]
fn test_only_one_attribute_changed_is_not_copied() {
    let harness = BackupTestHarness::new();
    harness.write("same_size.txt", "aaaa", 1_000);
    harness.write("same_mtime.txt", "short", 1_000);
    harness.engine.full().unwrap();

    harness.write("same_size.txt", "bbbb", 2_000);
    harness.write("same_mtime.txt", "much longer now", 1_000);

    let report = harness.engine.incremental().unwrap();

    assert!(file_map(&report.snapshot_path).is_empty());
}

#[test]
fn test_content_hash_catches_same_size_edit() {
    let harness = BackupTestHarness::with_detection(ChangeDetection::ContentHash);
    harness.write("same_size.txt", "aaaa", 1_000);
    harness.write("untouched.txt", "stay", 1_000);
    harness.engine.full().unwrap();

    harness.write("same_size.txt", "bbbb", 1_000);

    let report = harness.engine.incremental().unwrap();

    assert_eq!(
        file_map(&report.snapshot_path),
        vec![("same_size.txt".to_string(), "bbbb".to_string())]
    );
}

#[test]
fn test_second_full_moves_baseline() {
    let harness = BackupTestHarness::new();
    harness.write("file.txt", "one", 1_000);
    let first = harness.engine.full().unwrap();

    harness.write("file.txt", "two!", 2_000);
    let second = harness.engine.full().unwrap();
    assert_ne!(first.snapshot, second.snapshot);
    assert_eq!(harness.pointer(), Some(second.snapshot.clone()));

    // Nothing changed since the second full snapshot
    let incremental = harness.engine.incremental().unwrap();
    assert_eq!(incremental.baseline, Some(second.snapshot));
    assert!(file_map(&incremental.snapshot_path).is_empty());
}

#[test]
fn test_first_incremental_falls_back_to_full() {
    let harness = BackupTestHarness::new();
    harness.write("a.txt", "a", 1_000);
    harness.write("dir/b.txt", "b", 1_000);

    let report = harness.engine.incremental().unwrap();

    assert!(report.fell_back_to_full);
    assert_eq!(report.mode, BackupMode::Full);
    assert_eq!(harness.pointer(), Some(report.snapshot.clone()));
    assert_eq!(file_map(&report.snapshot_path), file_map(harness.source()));
}

#[test]
fn test_dangling_pointer_creates_nothing() {
    let harness = BackupTestHarness::new();
    harness.write("a.txt", "a", 1_000);
    PointerFile::in_root(harness.root())
        .write("2001-01-01-00-00-00")
        .unwrap();

    let err = harness.engine.incremental().unwrap_err();

    assert_eq!(err.category(), ErrorCategory::PathNotFound);
    assert!(harness.snapshot_names().is_empty());
}

#[test]
fn test_backup_root_inside_source_is_rejected() {
    let harness = BackupTestHarness::new();
    harness.write("a.txt", "a", 1_000);
    let nested = harness.mkdir("backups", 1_000);

    let err = BackupEngine::new(harness.source().to_path_buf(), nested.clone())
        .full()
        .unwrap_err();

    assert!(matches!(err, BackupError::DestinationInsideSource { .. }));
    assert_eq!(fs::read_dir(&nested).unwrap().count(), 0);
}

#[test]
fn test_restore_full_then_incremental() {
    let harness = BackupTestHarness::new();
    harness.write("file1.txt", "A", 1_000);
    harness.write("sub/file2.txt", "B", 1_000);
    harness.mkdir("sub", 1_000);
    let full = harness.engine.full().unwrap();

    harness.write("file1.txt", "AA", 2_000);
    harness.write("added.txt", "new", 2_000);
    let incremental = harness.engine.incremental().unwrap();

    let target = TempDir::new().unwrap();
    RestoreEngine::new(full.snapshot_path.clone(), target.path().to_path_buf())
        .run()
        .unwrap();
    let report = RestoreEngine::new(incremental.snapshot_path.clone(), target.path().to_path_buf())
        .run()
        .unwrap();

    assert_eq!(report.stats.files_copied, 2);
    assert_eq!(file_map(target.path()), file_map(harness.source()));
    assert_eq!(mtime(&target.path().join("file1.txt")), mtime(&harness.source().join("file1.txt")));
}

#[test]
fn test_restore_twice_copies_nothing_second_time() -> anyhow::Result<()> {
    let harness = BackupTestHarness::new();
    harness.populate(&[("a.txt", "a"), ("d/b.txt", "b")], 1_000)?;
    let full = harness.engine.full()?;

    let target = TempDir::new()?;
    let restore = RestoreEngine::new(full.snapshot_path.clone(), target.path().to_path_buf());
    let first = restore.run()?;
    let second = restore.run()?;

    assert_eq!(first.stats.files_copied, 2);
    assert!(!second.stats.has_changes());
    Ok(())
}

#[test]
fn test_listing_orders_same_second_snapshots() {
    let harness = BackupTestHarness::new();
    harness.write("a.txt", "a", 1_000);

    let reports: Vec<BackupReport> = (0..3).map(|_| harness.engine.full().unwrap()).collect();

    let names = harness.snapshot_names();
    let expected: Vec<String> = reports.iter().map(|r| r.snapshot.clone()).collect();
    assert_eq!(names, expected);
    assert_eq!(harness.pointer(), expected.last().cloned());
}
