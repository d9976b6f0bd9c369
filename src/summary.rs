use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::records::CsvStats;

pub const SUMMARY_FILE_NAME: &str = "backup_summary.txt";

/// Build the text of `backup_summary.txt`.
pub fn render(
    backup_dir: &Path,
    csv_stats: &[(PathBuf, CsvStats)],
    logs_archived: usize,
    cutoff: NaiveDateTime,
    run_at: NaiveDateTime,
) -> String {
    let dir = backup_dir.display();
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "BACKUP SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out, "Backup Date: {}", run_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Cutoff Date: {} (data older than this was archived)",
        cutoff.format("%Y-%m-%d")
    );
    let _ = writeln!(out, "Backup Location: {}\n", dir);

    let _ = writeln!(out, "CSV FILES PROCESSED:");
    let _ = writeln!(out, "{}", "-".repeat(30));
    let (mut total_archived, mut total_kept) = (0, 0);
    for (path, stats) in csv_stats {
        let _ = writeln!(out, "File: {}", path.display());
        let _ = writeln!(out, "  - Entries archived: {}", stats.archived);
        let _ = writeln!(out, "  - Entries kept: {}", stats.kept);
        total_archived += stats.archived;
        total_kept += stats.kept;
    }

    let _ = writeln!(out, "\nTOTAL CSV ENTRIES:");
    let _ = writeln!(out, "  - Total archived: {}", total_archived);
    let _ = writeln!(out, "  - Total kept active: {}\n", total_kept);

    let _ = writeln!(out, "LOG FILES:");
    let _ = writeln!(out, "  - Old log files archived: {}\n", logs_archived);

    let _ = writeln!(out, "BACKUP STRUCTURE:");
    let _ = writeln!(out, "{}", "-".repeat(20));
    let _ = writeln!(out, "{}/", dir);
    out.push_str(
        "├── csv_files/\n\
         │   ├── jobs_old_entries.csv\n\
         │   └── final_ml_jobs_old_entries.csv\n\
         ├── logs/\n\
         │   └── old_logs.zip\n\
         └── backup_summary.txt\n",
    );
    out
}

/// Write the summary into `backup_dir` and return its path.
pub fn write(
    backup_dir: &Path,
    csv_stats: &[(PathBuf, CsvStats)],
    logs_archived: usize,
    cutoff: NaiveDateTime,
    run_at: NaiveDateTime,
) -> Result<PathBuf> {
    let path = backup_dir.join(SUMMARY_FILE_NAME);
    let text = render(backup_dir, csv_stats, logs_archived, cutoff, run_at);
    fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    info!("📋 Created backup summary: {}", path.display());
    Ok(path)
}
