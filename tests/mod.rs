//! Main test module for backsnap
//!
//! This module includes all test suites:
//! - Integration tests for multi-run scenarios
//! - Property-based tests for backup/restore invariants
//! - Edge cases for precondition handling

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use ::backsnap::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_empty_source() {
        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();

        let report = BackupEngine::new(source.path().to_path_buf(), backups.path().to_path_buf())
            .full()
            .unwrap();

        assert_eq!(report.stats, CopyStats::default());
        assert!(report.snapshot_path.is_dir());
        assert_eq!(fs::read_dir(&report.snapshot_path).unwrap().count(), 0);
    }

    #[test]
    fn test_special_filenames() {
        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "file@with#special$chars.txt",
            "file(with)parens.txt",
            "файл.txt",
        ];
        let mut written = Vec::new();
        for name in &special_names {
            if fs::write(source.path().join(name), format!("Content of {}", name)).is_ok() {
                written.push(*name);
            }
        }

        let report = BackupEngine::new(source.path().to_path_buf(), backups.path().to_path_buf())
            .full()
            .unwrap();

        for name in written {
            assert_eq!(
                fs::read_to_string(report.snapshot_path.join(name)).unwrap(),
                format!("Content of {}", name)
            );
        }
    }

    #[test]
    fn test_source_is_a_file() {
        let holder = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        let file = holder.path().join("file1.txt");
        fs::write(&file, "x").unwrap();

        let err = BackupEngine::new(file, backups.path().to_path_buf())
            .full()
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::NotADirectory);
        assert_eq!(fs::read_dir(backups.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_destination() {
        let source = TempDir::new().unwrap();
        let holder = TempDir::new().unwrap();

        let err = BackupEngine::new(source.path().to_path_buf(), holder.path().join("nope"))
            .incremental()
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::PathNotFound);
    }

    #[test]
    fn test_insufficient_space_leaves_root_untouched() {
        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        fs::write(source.path().join("big.bin"), vec![7u8; 4096]).unwrap();

        let err = BackupEngine::builder()
            .space_probe(Arc::new(FixedSpace(4095)))
            .build(source.path().to_path_buf(), backups.path().to_path_buf())
            .full()
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::InsufficientSpace);
        assert_eq!(fs::read_dir(backups.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_skipped_in_full_backup() {
        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "a").unwrap();
        fs::create_dir(source.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(source.path().join("gone"), source.path().join("dangling")).unwrap();
        std::os::unix::fs::symlink(source.path().join("sub/gone"), source.path().join("sub/broken")).unwrap();

        let report = BackupEngine::new(source.path().to_path_buf(), backups.path().to_path_buf())
            .full()
            .unwrap();

        assert_eq!(fs::read_to_string(report.snapshot_path.join("a.txt")).unwrap(), "a");
        assert!(report.snapshot_path.join("sub").is_dir());
        assert!(fs::symlink_metadata(report.snapshot_path.join("dangling")).is_err());
        assert!(fs::symlink_metadata(report.snapshot_path.join("sub/broken")).is_err());
        assert_eq!(report.stats.files_copied, 1);
        assert_eq!(report.stats.entries_skipped, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_skipped_in_incremental_backup() {
        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "a").unwrap();

        let engine = BackupEngine::builder()
            .check_space(false)
            .build(source.path().to_path_buf(), backups.path().to_path_buf());
        engine.full().unwrap();

        std::os::unix::fs::symlink(source.path().join("gone"), source.path().join("dangling")).unwrap();
        let report = engine.incremental().unwrap();

        assert_eq!(report.mode, BackupMode::Incremental);
        assert_eq!(fs::read_dir(&report.snapshot_path).unwrap().count(), 0);

        // The space guard walks the same tree
        let report = BackupEngine::new(source.path().to_path_buf(), backups.path().to_path_buf())
            .incremental()
            .unwrap();
        assert_eq!(report.stats.files_copied, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_source_file_aborts_backup() {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        fs::write(source.path().join("ok.txt"), "fine").unwrap();
        let secret = source.path().join("test_file.txt");
        fs::write(&secret, "Hello, World!").unwrap();
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

        let err = BackupEngine::new(source.path().to_path_buf(), backups.path().to_path_buf())
            .full()
            .unwrap_err();

        assert!(matches!(
            err,
            BackupError::PermissionDenied { ref path, access: Access::Read } if *path == secret
        ));
        // The pointer is only written after a complete full snapshot
        let pointer = PointerFile::in_root(backups.path());
        assert_eq!(pointer.read().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_backup_root() {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "a").unwrap();
        fs::set_permissions(backups.path(), fs::Permissions::from_mode(0o500)).unwrap();

        let err = BackupEngine::new(source.path().to_path_buf(), backups.path().to_path_buf())
            .full()
            .unwrap_err();

        fs::set_permissions(backups.path(), fs::Permissions::from_mode(0o700)).unwrap();
        assert!(matches!(err, BackupError::PermissionDenied { access: Access::Write, .. }));
    }
}
