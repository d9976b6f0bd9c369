use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

use crate::dates::{is_old, parse_date_cell, ParsedDate};

/// Column every record is partitioned on.
pub const DATE_COLUMN: &str = "date_added";

/// Per-file row counts. `undated` rows are a subset of `kept`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CsvStats {
    pub archived: usize,
    pub kept: usize,
    pub undated: usize,
}

/// What happened to one CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvOutcome {
    Missing,
    Empty,
    NoDateColumn,
    Partitioned(CsvStats),
}

impl CsvOutcome {
    pub fn stats(&self) -> CsvStats {
        match self {
            CsvOutcome::Partitioned(stats) => *stats,
            _ => CsvStats::default(),
        }
    }
}

/// Rows of one file split by age. Field bytes are kept exactly as read;
/// short rows carry empty padding up to the header width.
struct Partition {
    headers: ByteRecord,
    old: Vec<ByteRecord>,
    recent: Vec<ByteRecord>,
    undated: usize,
}

/// Backup path for `source` inside a run directory:
/// `<backup_dir>/csv_files/<stem>_old_entries.<ext>`.
pub fn backup_path(backup_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "csv".into());
    backup_dir
        .join("csv_files")
        .join(format!("{}_old_entries.{}", stem, ext))
}

/// Move rows dated before `cutoff` out of `path` into the run's backup directory.
///
/// Missing files, empty files and files without a `date_added` column are
/// reported through [`CsvOutcome`] and left untouched. An `Err` means this file
/// could not be processed; callers are expected to carry on with the next one.
/// With `dry_run` nothing is written but the counts are still computed.
#[instrument(level = "debug", skip(path, backup_dir), fields(file = %path.display()))]
pub fn backup_and_clean_csv(
    path: &Path,
    backup_dir: &Path,
    cutoff: NaiveDateTime,
    dry_run: bool,
) -> Result<CsvOutcome> {
    if !path.exists() {
        warn!("⚠️  CSV file not found: {}", path.display());
        return Ok(CsvOutcome::Missing);
    }
    info!("📂 Processing CSV: {}", path.display());

    let (headers, rows) =
        read_rows(path).with_context(|| format!("parsing {}", path.display()))?;
    info!("   📊 Loaded {} total entries", rows.len());

    if rows.is_empty() {
        info!("   ✅ Empty file, nothing to process");
        return Ok(CsvOutcome::Empty);
    }

    let Some(date_idx) = headers.iter().position(|h| h == DATE_COLUMN.as_bytes()) else {
        warn!(
            "   ⚠️  No '{}' column found, skipping date-based filtering",
            DATE_COLUMN
        );
        return Ok(CsvOutcome::NoDateColumn);
    };

    let part = partition(headers, rows, date_idx, cutoff);
    let stats = CsvStats {
        archived: part.old.len(),
        kept: part.recent.len(),
        undated: part.undated,
    };

    info!(
        "   📅 Entries older than {}: {}",
        cutoff.format("%m/%d/%Y"),
        stats.archived
    );
    info!("   📅 Recent entries to keep: {}", stats.kept);
    if stats.undated > 0 {
        warn!(
            "   ⚠️  {} entries have a missing or unparseable '{}' and are kept as recent",
            stats.undated, DATE_COLUMN
        );
    }

    if stats.archived == 0 {
        info!("   ✅ No old entries to remove");
        return Ok(CsvOutcome::Partitioned(stats));
    }

    if dry_run {
        info!(
            "   🔍 [DRY RUN] Would backup {} entries and keep {}",
            stats.archived, stats.kept
        );
        return Ok(CsvOutcome::Partitioned(stats));
    }

    let backup_file = backup_path(backup_dir, path);
    append_rows(&backup_file, &part.headers, &part.old)?;
    info!(
        "   💾 Backed up {} old entries to: {}",
        stats.archived,
        backup_file.display()
    );

    replace_rows(path, &part.headers, &part.recent)?;
    info!("   🗑️  Removed {} old entries from main file", stats.archived);
    info!("   ✅ Kept {} recent entries", stats.kept);

    Ok(CsvOutcome::Partitioned(stats))
}

/// Read the header and every row. Short rows are padded with empty fields up
/// to the header width; a row wider than the header is an error.
fn read_rows(path: &Path) -> Result<(ByteRecord, Vec<ByteRecord>)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context("opening file")?;
    let headers = rdr.byte_headers().context("reading header")?.clone();
    let width = headers.len();

    let mut rows = Vec::new();
    for (i, result) in rdr.byte_records().enumerate() {
        let mut row = result.with_context(|| format!("reading record {}", i + 1))?;
        if row.len() > width {
            anyhow::bail!(
                "record {}: expected {} fields, saw {}",
                i + 1,
                width,
                row.len()
            );
        }
        while row.len() < width {
            row.push_field(b"");
        }
        rows.push(row);
    }
    Ok((headers, rows))
}

fn partition(
    headers: ByteRecord,
    rows: Vec<ByteRecord>,
    date_idx: usize,
    cutoff: NaiveDateTime,
) -> Partition {
    let mut part = Partition {
        headers,
        old: Vec::new(),
        recent: Vec::new(),
        undated: 0,
    };
    for row in rows {
        let cell = row
            .get(date_idx)
            .and_then(|raw| std::str::from_utf8(raw).ok());
        match parse_date_cell(cell) {
            ParsedDate::Date(d) if is_old(d, cutoff) => part.old.push(row),
            ParsedDate::Date(_) => part.recent.push(row),
            // undated rows never compare as old, so they stay active
            ParsedDate::Unparseable => {
                part.undated += 1;
                part.recent.push(row);
            }
        }
    }
    part
}

/// Append `rows` to `dest`, writing `headers` first only if `dest` has no content yet.
fn append_rows(dest: &Path, headers: &ByteRecord, rows: &[ByteRecord]) -> Result<()> {
    let has_content = fs::metadata(dest).map(|m| m.len() > 0).unwrap_or(false);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dest)
        .with_context(|| format!("opening backup file {}", dest.display()))?;
    write_rows(file, (!has_content).then_some(headers), rows)
        .with_context(|| format!("writing backup file {}", dest.display()))
}

/// Overwrite `path` with `headers` + `rows` via a sibling temp file and a rename.
fn replace_rows(path: &Path, headers: &ByteRecord, rows: &[ByteRecord]) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let tmp_path = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));

    let file = File::create(&tmp_path)
        .with_context(|| format!("creating temporary file {}", tmp_path.display()))?;
    write_rows(file, Some(headers), rows)
        .with_context(|| format!("writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} → {}", tmp_path.display(), path.display()))?;
    Ok(())
}

fn write_rows(file: File, headers: Option<&ByteRecord>, rows: &[ByteRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(file);
    if let Some(h) = headers {
        wtr.write_byte_record(h)?;
    }
    for row in rows {
        wtr.write_byte_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
