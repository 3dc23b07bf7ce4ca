//! Settings loading and resolution
//!
//! Resolution priority for the settings file path:
//! 1. Command-line argument (highest priority)
//! 2. `CLOCKHARVEST_CONFIG` environment variable
//! 3. Per-user config dir (`~/.config/clockharvest/config.toml`)
//! 4. Compiled defaults (no file at all)
//!
//! A missing settings file is not fatal: the harvester warns and starts with
//! compiled defaults. A present-but-malformed file is a configuration error
//! and aborts before any device is contacted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV_VAR: &str = "CLOCKHARVEST_CONFIG";

/// Harvester settings
///
/// Every field carries a serde default so a partial TOML file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Opaque site identifier forwarded to persistence with every batch.
    /// Semantics belong to the downstream HR system; never interpreted here.
    pub site_id: i64,
    /// Accepted mark window: [today - window_days, today], inclusive
    pub window_days: u32,
    /// Reachability probes issued per device before giving up
    pub probe_attempts: u32,
    /// Per-probe timeout in milliseconds
    pub probe_timeout_ms: u64,
    /// Device connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Raw-record fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,
    /// Persistence round-trip timeout in milliseconds
    pub persist_timeout_ms: u64,
    /// Devices processed concurrently; 1 = strictly sequential
    pub max_concurrency: usize,
    /// Device port used when a registration does not specify one
    pub default_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            site_id: 4570,
            window_days: 1,
            probe_attempts: 2,
            probe_timeout_ms: 2_000,
            connect_timeout_ms: 10_000,
            fetch_timeout_ms: 30_000,
            persist_timeout_ms: 10_000,
            max_concurrency: 1,
            default_port: 4370,
        }
    }
}

impl Settings {
    /// Load settings, resolving the file path per the priority order above.
    ///
    /// `cli_path` is the `--config` argument, if the operator passed one.
    /// An explicitly named file (CLI or env) that does not exist is an error;
    /// an absent default-location file just means compiled defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        warn!("No settings file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Parse a settings file, failing on absence or malformed TOML
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read settings file {}: {}", path.display(), e))
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Malformed settings file {}: {}", path.display(), e))
        })?;
        info!("Loaded settings from {}", path.display());
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make a harvesting run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".into()));
        }
        if self.probe_attempts == 0 {
            return Err(Error::Config("probe_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Per-user settings file location, when the platform exposes a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clockharvest").join("config.toml"))
}

/// Compiled default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("clockharvest").join("clockharvest.db"))
        .unwrap_or_else(|| PathBuf::from("./clockharvest.db"))
}
