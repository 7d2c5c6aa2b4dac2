//! Runtime configuration.

use crate::errors::FedstageResult;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FedstageConfig {
    /// Maximum number of rows returned by an output data preview.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
    /// Sample-id column name used when a dataset schema names none.
    #[serde(default = "default_sid_name")]
    pub default_sid_name: String,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_preview_limit() -> usize {
    100
}

fn default_sid_name() -> String {
    "sid".to_string()
}

impl Default for FedstageConfig {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
            default_sid_name: default_sid_name(),
            log: LogConfig::default(),
        }
    }
}

impl FedstageConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// Malformed JSON is a serialization error.
    pub fn from_json_str(raw: &str) -> FedstageResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Defaults overlaid with `FEDSTAGE_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("FEDSTAGE_PREVIEW_LIMIT") {
            match raw.parse() {
                Ok(limit) => self.preview_limit = limit,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid FEDSTAGE_PREVIEW_LIMIT"),
            }
        }
        if let Some(level) = lookup("FEDSTAGE_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(raw) = lookup("FEDSTAGE_LOG_JSON") {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.log.json = true,
                "0" | "false" | "no" => self.log.json = false,
                _ => tracing::warn!(value = %raw, "Ignoring invalid FEDSTAGE_LOG_JSON"),
            }
        }
        self
    }

    /// Sets the preview limit.
    #[must_use]
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// Sets the default sample-id column name.
    #[must_use]
    pub fn with_default_sid_name(mut self, name: impl Into<String>) -> Self {
        self.default_sid_name = name.into();
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
