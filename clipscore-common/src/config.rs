//! Bootstrap configuration and root folder resolution
//!
//! Bootstrap settings come from a TOML file and cannot change while a service
//! runs. Business policy (thresholds, quotas, point amounts) lives in the
//! database `settings` table instead; see [`crate::db::settings`].
//!
//! Root folder resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `CLIPSCORE_ROOT_FOLDER` environment variable
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CLIPSCORE_ROOT_FOLDER";

/// Default database file name inside the root folder
pub const DEFAULT_DATABASE_FILE: &str = "clipscore.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database file name, relative to the root folder
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Token required in `X-Api-Key` for admin and webhook routes.
    /// `None` disables the check.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Seed for the coherence baseline RNG. `None` seeds from entropy.
    #[serde(default)]
    pub coherence_seed: Option<u64>,

    /// Interval between quota reset sweeps
    #[serde(default = "default_sweep_interval")]
    pub quota_sweep_interval_secs: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_file: default_database_file(),
            host: default_host(),
            port: default_port(),
            admin_token: None,
            coherence_seed: None,
            quota_sweep_interval_secs: default_sweep_interval(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_database_file() -> String {
    DEFAULT_DATABASE_FILE.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load TOML config from `path`
///
/// A missing file is not fatal: a warning is logged and defaults are used.
/// A present but malformed file is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML config to `path`, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Default config file path for a service, e.g. `~/.config/clipscore/clipscore-ev.toml`
pub fn default_config_path(service_name: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clipscore")
        .join(format!("{}.toml", service_name))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("clipscore"))
        .unwrap_or_else(|| PathBuf::from("./clipscore_data"))
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root folder passed on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder read from the TOML config
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_value = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self, database_file: &str) -> PathBuf {
        self.root_folder.join(database_file)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
