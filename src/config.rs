use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "config/scraper_config.yaml";

/// Paths the cleanup run operates on. Any key missing from the YAML falls
/// back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub main_csv_file: PathBuf,
    pub filtered_csv_file: PathBuf,
    pub log_dir: PathBuf,
    pub backup_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_csv_file: PathBuf::from("output/jobs.csv"),
            filtered_csv_file: PathBuf::from("output/final_ml_jobs.csv"),
            log_dir: PathBuf::from("output/logs"),
            backup_root: PathBuf::from("backups"),
        }
    }
}

impl Config {
    /// Load from `path`, or return the defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // an empty document deserializes to unit, not a map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// CSV files in processing order.
    pub fn csv_files(&self) -> [&Path; 2] {
        [&self.main_csv_file, &self.filtered_csv_file]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let tmp = tempdir()?;
        let cfg = Config::load(tmp.path().join("nope.yaml"))?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.main_csv_file, PathBuf::from("output/jobs.csv"));
        Ok(())
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("scraper_config.yaml");
        fs::write(
            &path,
            "main_csv_file: data/all.csv\nlog_dir: data/logs\nsearch_terms: [rust]\n",
        )?;
        let cfg = Config::load(&path)?;
        assert_eq!(cfg.main_csv_file, PathBuf::from("data/all.csv"));
        assert_eq!(cfg.log_dir, PathBuf::from("data/logs"));
        assert_eq!(cfg.filtered_csv_file, PathBuf::from("output/final_ml_jobs.csv"));
        assert_eq!(cfg.backup_root, PathBuf::from("backups"));
        Ok(())
    }

    #[test]
    fn malformed_yaml_is_an_error() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("bad.yaml");
        fs::write(&path, "main_csv_file: [unclosed\n")?;
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.yaml"));
        Ok(())
    }

    #[test]
    fn empty_yaml_is_defaults() -> Result<()> {
        assert_eq!(Config::from_yaml("\n")?, Config::default());
        Ok(())
    }
}
