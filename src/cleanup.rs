//! The end-to-end backup & cleanup run.
//!
//! Steps run strictly in order: compute the cutoff, create the backup
//! directory (skipped in dry-run), partition each CSV, archive old logs,
//! then write the summary if anything was archived.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info};

use crate::{
    config::Config,
    dates::cutoff,
    logs::backup_old_logs,
    records::{backup_and_clean_csv, CsvStats},
    summary,
};

/// Flags for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub keep_weeks: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            keep_weeks: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Something was archived; a summary was written into `backup_dir`.
    Archived {
        backup_dir: PathBuf,
        summary: PathBuf,
    },
    DryRun,
    NothingToArchive,
}

/// Everything a run did, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub cutoff: NaiveDateTime,
    pub csv_stats: Vec<(PathBuf, CsvStats)>,
    pub logs_archived: usize,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn total_archived(&self) -> usize {
        self.csv_stats.iter().map(|(_, s)| s.archived).sum()
    }

    pub fn total_kept(&self) -> usize {
        self.csv_stats.iter().map(|(_, s)| s.kept).sum()
    }
}

/// Create `<root>/backup_<YYYYMMDD_HHMMSS>/{csv_files,logs}` and return the run directory.
pub fn create_backup_structure(root: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    let dir = root.join(format!("backup_{}", now.format("%Y%m%d_%H%M%S")));
    for sub in ["csv_files", "logs"] {
        let d = dir.join(sub);
        fs::create_dir_all(&d).with_context(|| format!("creating {}", d.display()))?;
    }
    Ok(dir)
}

/// Run the whole cleanup as of `now`, which also names the backup directory.
pub fn run_at(config: &Config, options: &RunOptions, now: NaiveDateTime) -> Result<RunReport> {
    // ─── 1) cutoff ───────────────────────────────────────────────────
    info!("🚀 Starting backup and cleanup process");
    if options.dry_run {
        info!("🔍 Running in DRY RUN mode - no changes will be made");
    }

    let cutoff = cutoff(now, options.keep_weeks);
    info!("📅 Cutoff date: {}", cutoff.format("%Y-%m-%d %H:%M:%S"));
    info!("📅 Keeping data from the last {} weeks", options.keep_weeks);

    // ─── 2) backup dir ───────────────────────────────────────────────
    let backup_dir = if options.dry_run {
        config.backup_root.join("dry_run")
    } else {
        let dir = create_backup_structure(&config.backup_root, now)?;
        info!("📁 Created backup directory: {}", dir.display());
        dir
    };

    // ─── 3) CSV files, one at a time ─────────────────────────────────
    let mut csv_stats = Vec::with_capacity(2);
    for path in config.csv_files() {
        let stats = match backup_and_clean_csv(path, &backup_dir, cutoff, options.dry_run) {
            Ok(outcome) => outcome.stats(),
            Err(e) => {
                error!("   ❌ Error processing {}: {:#}", path.display(), e);
                CsvStats::default()
            }
        };
        csv_stats.push((path.to_path_buf(), stats));
    }

    // ─── 4) logs ─────────────────────────────────────────────────────
    let logs_archived = backup_old_logs(&config.log_dir, &backup_dir, cutoff, options.dry_run)?;

    // ─── 5) summary ──────────────────────────────────────────────────
    let mut report = RunReport {
        cutoff,
        csv_stats,
        logs_archived,
        outcome: RunOutcome::NothingToArchive,
    };
    let anything_archived = report.total_archived() > 0 || logs_archived > 0;

    if options.dry_run {
        report.outcome = RunOutcome::DryRun;
    } else if anything_archived {
        let summary = summary::write(&backup_dir, &report.csv_stats, logs_archived, cutoff, now)?;
        report.outcome = RunOutcome::Archived {
            backup_dir,
            summary,
        };
    }

    info!("🎉 Backup and cleanup completed!");
    info!("   📊 Total CSV entries archived: {}", report.total_archived());
    info!("   📊 Total CSV entries kept active: {}", report.total_kept());
    info!("   📁 Log files archived: {}", report.logs_archived);
    match &report.outcome {
        RunOutcome::Archived { backup_dir, .. } => {
            info!("   💾 Backup saved to: {}", backup_dir.display())
        }
        RunOutcome::DryRun => info!("   🔍 This was a dry run - no actual changes made"),
        RunOutcome::NothingToArchive => info!("   ✅ No old data found to archive"),
    }

    Ok(report)
}
