use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::PathArgs;
use crate::error::{Error, Result};
use crate::scan::source::NamePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub database: PathBuf,
    pub suffix: String,
    pub name_policy: NamePolicy,
    pub interval: Duration,
    pub startup_attempts: u32,
    pub startup_delay: Duration,
    pub pool_size: usize,
    pub verbose: bool,
}

/// On-disk shape of config.toml. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    source_dir: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
    database: Option<PathBuf>,
    suffix: Option<String>,
    name_policy: Option<NamePolicy>,
    interval: Option<String>,
    startup_attempts: Option<u32>,
    startup_delay: Option<String>,
    pool_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_dir: PathBuf::from("/app/configs"),
            archive_dir: PathBuf::from("/app/archived_configs"),
            database: default_database_path(),
            suffix: "config".to_string(),
            name_policy: NamePolicy::Keep,
            interval: Duration::from_secs(30),
            startup_attempts: 30,
            startup_delay: Duration::from_secs(2),
            pool_size: 4,
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then nothing else. An explicit path
    /// must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(path) = path {
            let text = fs::read_to_string(&path).map_err(|e| Error::io("read config file", &path, e))?;
            config.merge_toml(&text)?;
        }

        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config = Config::default();
        config.merge_toml(text)?;
        Ok(config)
    }

    fn merge_toml(&mut self, text: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(text).map_err(|e| Error::config(e.to_string()))?;

        if let Some(v) = file.source_dir {
            self.source_dir = v;
        }
        if let Some(v) = file.archive_dir {
            self.archive_dir = v;
        }
        if let Some(v) = file.database {
            self.database = v;
        }
        if let Some(v) = file.suffix {
            self.suffix = v;
        }
        if let Some(v) = file.name_policy {
            self.name_policy = v;
        }
        if let Some(v) = file.interval {
            self.interval = parse_duration("interval", &v)?;
        }
        if let Some(v) = file.startup_attempts {
            self.startup_attempts = v;
        }
        if let Some(v) = file.startup_delay {
            self.startup_delay = parse_duration("startup_delay", &v)?;
        }
        if let Some(v) = file.pool_size {
            self.pool_size = v;
        }

        Ok(())
    }

    /// Command line flags win over the file.
    pub fn apply_args(&mut self, args: &PathArgs, verbose: bool) {
        if let Some(dir) = &args.source_dir {
            self.source_dir = dir.clone();
        }
        if let Some(dir) = &args.archive_dir {
            self.archive_dir = dir.clone();
        }
        if let Some(db) = &args.database {
            self.database = db.clone();
        }
        if let Some(suffix) = &args.suffix {
            self.suffix = suffix.clone();
        }
        if let Some(policy) = args.name_policy {
            self.name_policy = policy;
        }
        self.verbose = self.verbose || verbose;
    }

    pub fn validate(&self) -> Result<()> {
        if self.suffix.is_empty() {
            return Err(Error::config("suffix must not be empty"));
        }
        if self.pool_size == 0 {
            return Err(Error::config("pool_size must be at least 1"));
        }
        if self.startup_attempts == 0 {
            return Err(Error::config("startup_attempts must be at least 1"));
        }
        if self.interval.is_zero() {
            return Err(Error::config("interval must be greater than zero"));
        }
        Ok(())
    }
}

pub fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| Error::config(format!("invalid {key} '{value}': {e}")))
}

/// ~/.config/blackbox/config.toml or platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "blackbox").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// ~/.local/share/blackbox/blackbox.db or platform equivalent
pub fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "blackbox")
        .map(|dirs| dirs.data_dir().join("blackbox.db"))
        .unwrap_or_else(|| PathBuf::from("blackbox.db"))
}
