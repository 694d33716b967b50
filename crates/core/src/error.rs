//! Error type shared by every clonenux crate.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InventoryError>;

/// Point at which host discovery could not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStage {
    /// The host discovery subsystem is missing or unreadable.
    Subsystem,
    /// The block-class enumeration could not be opened.
    Enumerate,
    /// The device list could not be read back.
    DeviceList,
    /// The timed discovery worker could not be started or died before
    /// reporting.
    Worker,
}

impl fmt::Display for DiscoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Subsystem => "subsystem",
            Self::Enumerate => "enumerate",
            Self::DeviceList => "device list",
            Self::Worker => "worker",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("[CNX-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CNX-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CNX-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CNX-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[CNX-2001] device discovery unavailable ({stage}): {details}")]
    DiscoveryUnavailable {
        stage: DiscoveryStage,
        details: String,
    },

    #[error("[CNX-2002] device discovery timed out after {timeout_ms}ms")]
    DiscoveryTimedOut { timeout_ms: u64 },

    #[error("[CNX-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CNX-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InventoryError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CNX-1001",
            Self::MissingConfig { .. } => "CNX-1002",
            Self::ConfigParse { .. } => "CNX-1003",
            Self::UnsupportedPlatform { .. } => "CNX-1101",
            Self::DiscoveryUnavailable { .. } => "CNX-2001",
            Self::DiscoveryTimedOut { .. } => "CNX-2002",
            Self::Serialization { .. } => "CNX-2101",
            Self::Io { .. } => "CNX-3001",
        }
    }

    /// Whether another discovery attempt might succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryUnavailable { .. } | Self::DiscoveryTimedOut { .. }
        )
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn discovery(stage: DiscoveryStage, details: impl fmt::Display) -> Self {
        Self::DiscoveryUnavailable {
            stage,
            details: details.to_string(),
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for InventoryError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
