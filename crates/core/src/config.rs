//! Configuration: TOML file, then `CLONENUX_*` environment overrides, then validation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};
use crate::DEFAULT_MAX_ENTRIES;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub inventory: InventoryConfig,
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
}

/// Capacity and per-field bounds applied while building an inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InventoryConfig {
    pub max_entries: usize,
    pub model_max_len: usize,
    pub path_max_len: usize,
    pub name_max_len: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            model_max_len: 256,
            path_max_len: 4096,
            name_max_len: 255,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub sys_root: PathBuf,
    pub dev_root: PathBuf,
    /// Zero disables the timeout.
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            sys_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
            timeout_ms: 0,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry for discovery. `attempts` counts the first try.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LoggingLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LoggingLevel {
    type Err = InventoryError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(InventoryError::InvalidConfig {
                details: format!("unknown log level {other:?}"),
            }),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let base = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("/etc"));
        base.join("clonenux").join("config.toml")
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// A missing file at the default location falls back to defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw =
                fs::read_to_string(&path_buf).map_err(|source| InventoryError::io(&path_buf, source))?;
            toml::from_str(&raw)?
        } else if path.is_some() {
            return Err(InventoryError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CLONENUX_MAX_ENTRIES") {
            self.inventory.max_entries = parse_env("CLONENUX_MAX_ENTRIES", &raw)?;
        }
        if let Some(raw) = lookup("CLONENUX_SYS_ROOT") {
            self.discovery.sys_root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("CLONENUX_DEV_ROOT") {
            self.discovery.dev_root = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("CLONENUX_DISCOVERY_TIMEOUT_MS") {
            self.discovery.timeout_ms = parse_env("CLONENUX_DISCOVERY_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("CLONENUX_LOG_LEVEL") {
            self.logging.level = raw.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let inventory = &self.inventory;
        if inventory.max_entries == 0 {
            return Err(InventoryError::InvalidConfig {
                details: "inventory.max_entries must be at least 1".to_string(),
            });
        }
        for (name, value) in [
            ("inventory.model_max_len", inventory.model_max_len),
            ("inventory.path_max_len", inventory.path_max_len),
            ("inventory.name_max_len", inventory.name_max_len),
        ] {
            if value == 0 {
                return Err(InventoryError::InvalidConfig {
                    details: format!("{name} must be at least 1"),
                });
            }
        }
        if self.discovery.retry.attempts == 0 {
            return Err(InventoryError::InvalidConfig {
                details: "discovery.retry.attempts must be at least 1".to_string(),
            });
        }
        if self.discovery.sys_root.as_os_str().is_empty() {
            return Err(InventoryError::InvalidConfig {
                details: "discovery.sys_root must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| InventoryError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
