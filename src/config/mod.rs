//! Configuration is read from `~/.config/eddy/config.toml` at startup.
//!
//! If the file doesn't exist, a commented default is written. Missing keys
//! fall back to their defaults; an invalid file is an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::app::{EddyError, Result};
use crate::fetcher::http_fetcher::DEFAULT_TIMEOUT_SECS;
use crate::fetcher::parallel::DEFAULT_WORKERS;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of feeds fetched in parallel.
    pub workers: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# eddy configuration

[database]
# Database file path. Defaults to the platform data directory.
# path = "/path/to/eddy.db"

[fetch]
# Number of feeds fetched in parallel.
# workers = 8
# Per-request timeout in seconds.
# timeout_secs = 10
"#;

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path()?;

        if !path.exists() {
            Self::write_default_config(&path)?;
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EddyError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EddyError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("eddy").join("config.toml"))
    }

    fn write_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fetch.workers, DEFAULT_WORKERS);
        assert_eq!(config.fetch.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[fetch]\nworkers = 2\n").unwrap();
        assert_eq!(config.fetch.workers, 2);
        assert_eq!(config.fetch.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_full_file() {
        let config: Config = toml::from_str(
            "[database]\npath = \"/tmp/eddy.db\"\n[fetch]\nworkers = 3\ntimeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/eddy.db")));
        assert_eq!(config.fetch.workers, 3);
        assert_eq!(config.fetch.timeout_secs, 5);
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.fetch.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "fetch = \"nope\"").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(EddyError::Config(_))
        ));
    }
}
