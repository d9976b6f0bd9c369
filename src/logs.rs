use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use glob::{glob, Pattern};
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::dates::local_naive;

pub const LOG_ARCHIVE_NAME: &str = "old_logs.zip";

/// `*.log` files directly inside `log_dir`, sorted by path.
pub fn list_log_files(log_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.log",
        Pattern::escape(&log_dir.to_string_lossy())
    );
    let mut files = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for log files")? {
        match entry {
            Ok(p) if p.is_file() => files.push(p),
            Ok(_) => {}
            Err(e) => warn!("cannot read log dir entry: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Zip every log file last modified before `cutoff` into
/// `<backup_dir>/logs/old_logs.zip` and delete the originals.
///
/// Returns how many files were (or, with `dry_run`, would be) archived. A
/// missing `log_dir` is not an error.
pub fn backup_old_logs(
    log_dir: &Path,
    backup_dir: &Path,
    cutoff: NaiveDateTime,
    dry_run: bool,
) -> Result<usize> {
    if !log_dir.is_dir() {
        warn!("⚠️  Log directory not found: {}", log_dir.display());
        return Ok(0);
    }
    info!("📁 Processing logs in: {}", log_dir.display());

    let log_files = list_log_files(log_dir)?;
    let mut old_logs = Vec::new();
    for path in &log_files {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("reading mtime of {}", path.display()))?;
        if local_naive(modified) < cutoff {
            old_logs.push(path.clone());
        }
    }

    info!("   📊 Total log files: {}", log_files.len());
    info!(
        "   📅 Old log files (before {}): {}",
        cutoff.format("%m/%d/%Y"),
        old_logs.len()
    );

    if old_logs.is_empty() {
        info!("   ✅ No old log files to archive");
        return Ok(0);
    }
    if dry_run {
        info!(
            "   🔍 [DRY RUN] Would archive and remove {} old log files",
            old_logs.len()
        );
        return Ok(old_logs.len());
    }

    let zip_path = backup_dir.join("logs").join(LOG_ARCHIVE_NAME);
    write_archive(&zip_path, &old_logs)?;
    info!(
        "   📦 Archived {} old logs to: {}",
        old_logs.len(),
        zip_path.display()
    );

    // only reached once the archive is complete on disk
    for path in &old_logs {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    info!("   🗑️  Removed {} old log files", old_logs.len());

    Ok(old_logs.len())
}

/// Deflate `files` into a new archive at `zip_path`, flattened to bare file names.
fn write_archive(zip_path: &Path, files: &[PathBuf]) -> Result<()> {
    let out = File::create(zip_path)
        .with_context(|| format!("creating {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?
            .to_string_lossy()
            .into_owned();
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("adding {} to archive", name))?;
        let mut src =
            File::open(path).with_context(|| format!("opening {}", path.display()))?;
        io::copy(&mut src, &mut zip).with_context(|| format!("compressing {}", path.display()))?;
    }

    let out = zip
        .finish()
        .with_context(|| format!("finishing {}", zip_path.display()))?;
    out.sync_all()
        .with_context(|| format!("syncing {}", zip_path.display()))?;
    Ok(())
}
