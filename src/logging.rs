use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::Dispatch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console + per-run file logging, owned by the caller instead of installed
/// globally. Everything logged inside [`Logging::scope`] reaches both sinks.
pub struct Logging {
    dispatch: Dispatch,
    log_file: Option<PathBuf>,
}

impl Logging {
    /// Build the sinks. With `log_dir` set, events are also written to
    /// `<log_dir>/<name>_<YYYYMMDD_HHMMSS>.log`; `None` keeps logging console-only.
    pub fn init(name: &str, log_dir: Option<&Path>, started: NaiveDateTime) -> Result<Self> {
        let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let console = fmt::layer().with_target(false);

        let (file_layer, log_file) = match log_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating log directory {}", dir.display()))?;
                let path = dir.join(format!("{}_{}.log", name, started.format("%Y%m%d_%H%M%S")));
                let file = File::create(&path)
                    .with_context(|| format!("creating log file {}", path.display()))?;
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Arc::new(file));
                (Some(layer), Some(path))
            }
            None => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(env)
            .with(console)
            .with(file_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            log_file,
        })
    }

    /// Run `f` with these sinks as the default subscriber.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;
    use tracing::{info, warn};

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 24)
            .unwrap()
            .and_hms_opt(13, 45, 1)
            .unwrap()
    }

    #[test]
    fn file_sink_receives_scoped_events() -> Result<()> {
        let tmp = tempdir()?;
        let dir = tmp.path().join("logs");
        let logging = Logging::init("backup_cleanup", Some(&dir), started())?;

        let path = logging.log_file().map(Path::to_path_buf).unwrap();
        assert_eq!(path, dir.join("backup_cleanup_20240624_134501.log"));

        logging.scope(|| {
            info!("🚀 scoped hello");
            warn!("careful");
        });
        let text = fs::read_to_string(&path)?;
        assert!(text.contains("🚀 scoped hello"));
        assert!(text.contains("WARN"));
        assert!(!text.contains('\u{1b}'), "file sink must not contain ANSI escapes");
        Ok(())
    }

    #[test]
    fn console_only_creates_nothing() -> Result<()> {
        let tmp = tempdir()?;
        let logging = Logging::init("backup_cleanup", None, started())?;
        assert!(logging.log_file().is_none());
        logging.scope(|| info!("console only"));
        assert_eq!(fs::read_dir(tmp.path())?.count(), 0);
        Ok(())
    }
}
