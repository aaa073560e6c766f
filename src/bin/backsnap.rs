//! # backsnap CLI
//!
//! Command-line front end for the backsnap library.
//!
//! ## Usage
//! ```bash
//! # Full snapshot of ./project into /mnt/backups
//! backsnap backup full ./project /mnt/backups
//!
//! # Incremental snapshot against the last full one
//! backsnap backup incremental ./project /mnt/backups
//!
//! # Restore a snapshot onto a directory
//! backsnap restore /mnt/backups/2024-03-09-07-05-03 ./project
//!
//! # List snapshots in a backup root
//! backsnap list /mnt/backups
//! ```
//!
//! Exit status is 0 on success and 1 on any failure, including malformed
//! arguments.

use backsnap::{
    format_bytes, list_snapshots, BackupEngine, BackupError, BackupMode, ChangeDetection, CopyStats,
    PointerFile, RestoreEngine, Result,
};
use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// backsnap - full and incremental directory snapshots
#[derive(Parser)]
#[command(name = "backsnap")]
#[command(version)]
#[command(about = "Back up a directory as timestamped full or incremental snapshots, and restore them")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a snapshot of PATH_FROM under the backup root PATH_TO
    Backup {
        /// Snapshot kind: full or incremental
        mode: String,

        /// Directory to back up
        path_from: PathBuf,

        /// Backup root holding snapshots and last_full.txt
        path_to: PathBuf,

        /// Compare file contents instead of mtime and size
        #[arg(long)]
        checksum: bool,

        /// Do not compare the source size with free space
        #[arg(long)]
        skip_space_check: bool,

        /// Show a spinner while copying
        #[arg(long)]
        progress: bool,
    },

    /// Restore the snapshot PATH_FROM onto the directory PATH_TO
    #[command(alias = "rs")]
    Restore {
        /// Snapshot directory
        path_from: PathBuf,

        /// Directory to restore onto
        path_to: PathBuf,

        /// Compare file contents instead of mtime and size
        #[arg(long)]
        checksum: bool,

        /// Show a spinner while copying
        #[arg(long)]
        progress: bool,
    },

    /// List snapshots in a backup root
    #[command(alias = "ls")]
    List {
        /// Backup root
        path: PathBuf,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout with status 0
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings, or debug output with `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Backup {
            mode,
            path_from,
            path_to,
            checksum,
            skip_space_check,
            progress,
        } => cmd_backup(&mode, path_from, path_to, checksum, skip_space_check, progress, cli.json),
        Commands::Restore {
            path_from,
            path_to,
            checksum,
            progress,
        } => cmd_restore(path_from, path_to, checksum, progress, cli.json),
        Commands::List { path } => cmd_list(path, cli.json),
    }
}

/// Create a full or incremental snapshot
///
/// The mode is validated before anything touches the filesystem.
fn cmd_backup(
    mode: &str,
    path_from: PathBuf,
    path_to: PathBuf,
    checksum: bool,
    skip_space_check: bool,
    show_progress: bool,
    json: bool,
) -> Result<()> {
    let mode: BackupMode = mode.parse()?;

    let engine = BackupEngine::builder()
        .change_detection(detection(checksum))
        .check_space(!skip_space_check)
        .build(path_from, path_to);

    let spinner = spinner(show_progress, format!("Creating {} snapshot...", mode));
    let result = engine.run(mode);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let report = result?;

    if json {
        return print_json(&report);
    }

    println!(
        "{} Created {} snapshot {}",
        "✓".green().bold(),
        report.mode,
        report.snapshot.yellow().bold()
    );
    if report.fell_back_to_full {
        println!("  {}", "No full snapshot recorded yet; ran a full backup".dimmed());
    }
    if let Some(baseline) = &report.baseline {
        println!("  Baseline: {}", baseline.cyan());
    }
    print_stats(&report.stats, report.duration_ms);

    Ok(())
}

/// Restore a snapshot onto a directory
fn cmd_restore(
    path_from: PathBuf,
    path_to: PathBuf,
    checksum: bool,
    show_progress: bool,
    json: bool,
) -> Result<()> {
    let engine = RestoreEngine::with_change_detection(path_from, path_to, detection(checksum));

    let spinner = spinner(show_progress, "Restoring files...".to_string());
    let result = engine.run();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let report = result?;

    if json {
        return print_json(&report);
    }

    println!(
        "{} Restored {} onto {}",
        "✓".green().bold(),
        report.source.display().to_string().yellow(),
        report.target.display().to_string().cyan()
    );
    print_stats(&report.stats, report.duration_ms);

    Ok(())
}

/// List snapshots, marking the current baseline with `*`
fn cmd_list(path: PathBuf, json: bool) -> Result<()> {
    let snapshots = list_snapshots(&path, &PointerFile::in_root(&path))?;

    if json {
        return print_json(&snapshots);
    }

    if snapshots.is_empty() {
        println!("{}", "No snapshots found.".yellow());
        return Ok(());
    }

    println!("{}", "Snapshots:".blue().bold());
    for snapshot in &snapshots {
        let marker = if snapshot.is_baseline {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!("{} {}", marker, snapshot.name);
    }

    Ok(())
}

// Helper functions

fn detection(checksum: bool) -> ChangeDetection {
    if checksum {
        ChangeDetection::ContentHash
    } else {
        ChangeDetection::MtimeAndSize
    }
}

fn spinner(enabled: bool, message: String) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn print_stats(stats: &CopyStats, duration_ms: u64) {
    println!("  Files: {}", stats.files_copied.to_string().cyan());
    println!("  Size: {}", format_bytes(stats.bytes_copied).cyan());
    println!("  Directories: {}", stats.directories_created.to_string().cyan());
    if stats.entries_skipped > 0 {
        println!("  Unchanged: {}", stats.entries_skipped.to_string().dimmed());
    }
    println!(
        "  Time: {}",
        format_duration(Duration::from_millis(duration_ms)).to_string().cyan()
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(BackupError::from)?;
    println!("{}", out);
    Ok(())
}
