use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use scrapekeeper::{
    cleanup::{self, RunOptions},
    config::{Config, DEFAULT_CONFIG_PATH},
    logging::Logging,
};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Backup and cleanup old job scraper data.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Show what would be done without making changes
    #[arg(long)]
    dry_run: bool,

    /// Number of weeks of data to keep
    #[arg(long, default_value_t = 2)]
    keep_weeks: u32,

    /// YAML file with `main_csv_file`, `filtered_csv_file` and `log_dir`
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let started = Local::now().naive_local();

    // the run log lives in the configured log dir, so until both are ready
    // failures go to a console-only sink
    let config = Config::load(&args.config).map_err(|e| report_fatal(e, started))?;

    // a dry run must not leave a log file behind either
    let log_dir = (!args.dry_run).then_some(config.log_dir.as_path());
    let logging = Logging::init("backup_cleanup", log_dir, started)
        .map_err(|e| report_fatal(e, started))?;

    logging.scope(|| {
        if let Some(path) = logging.log_file() {
            debug!("logging to {}", path.display());
        }
        if args.config.exists() {
            info!("📄 Loaded config from {}", args.config.display());
        } else {
            info!("📄 No config at {}, using default paths", args.config.display());
        }
        let options = RunOptions {
            dry_run: args.dry_run,
            keep_weeks: args.keep_weeks,
        };
        cleanup::run_at(&config, &options, started).map_err(log_failure)
    })?;

    Ok(())
}

fn log_failure(e: anyhow::Error) -> anyhow::Error {
    error!("💥 Backup process failed: {:#}", e);
    error!("Full error details: {:?}", e);
    e
}

/// Log a startup failure through a console-only sink and hand the error back.
fn report_fatal(e: anyhow::Error, started: NaiveDateTime) -> anyhow::Error {
    match Logging::init("backup_cleanup", None, started) {
        Ok(console) => console.scope(|| log_failure(e)),
        Err(_) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn flags_default_to_two_weeks_live_run() {
        let args = Args::try_parse_from(["scrapekeeper"]).unwrap();
        assert!(!args.dry_run);
        assert_eq!(args.keep_weeks, 2);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));

        let args =
            Args::try_parse_from(["scrapekeeper", "--dry-run", "--keep-weeks", "4"]).unwrap();
        assert!(args.dry_run);
        assert_eq!(args.keep_weeks, 4);
    }

    #[test]
    fn startup_failure_is_logged_and_returned() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scraper_config.yaml");
        std::fs::write(&path, "log_dir: [unclosed\n").unwrap();
        let started = NaiveDate::from_ymd_opt(2024, 6, 24)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let err = Config::load(&path)
            .map_err(|e| report_fatal(e, started))
            .unwrap_err();
        assert!(format!("{err:#}").contains("scraper_config.yaml"));
        // console-only: nothing was written next to the config
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
