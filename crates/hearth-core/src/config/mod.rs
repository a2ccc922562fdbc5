//! Client configuration.
//!
//! Values come in layers: an optional JSON file, then `HEARTH_*`
//! environment variables, then command-line flags. Later layers win.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ReminderTime;
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One partial source of settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub default_reminder_time: Option<String>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let poll_interval_secs = optional_trimmed(&lookup, "HEARTH_POLL_INTERVAL_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    ConfigError::Invalid(
                        "HEARTH_POLL_INTERVAL_SECS must be a positive integer".to_string(),
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            api_base_url: optional_trimmed(&lookup, "HEARTH_API_URL"),
            access_token: optional_trimmed(&lookup, "HEARTH_ACCESS_TOKEN"),
            owner_id: optional_trimmed(&lookup, "HEARTH_OWNER_ID"),
            poll_interval_secs,
            default_reminder_time: optional_trimmed(&lookup, "HEARTH_DEFAULT_REMINDER_TIME"),
            database_path: optional_trimmed(&lookup, "HEARTH_DB_PATH").map(PathBuf::from),
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw)
            .map_err(|error| ConfigError::Invalid(format!("config file: {error}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Values set in `other` replace ours.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_base_url: normalize_text_option(other.api_base_url)
                .or_else(|| normalize_text_option(self.api_base_url)),
            access_token: normalize_text_option(other.access_token)
                .or_else(|| normalize_text_option(self.access_token)),
            owner_id: normalize_text_option(other.owner_id)
                .or_else(|| normalize_text_option(self.owner_id)),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            default_reminder_time: normalize_text_option(other.default_reminder_time)
                .or_else(|| normalize_text_option(self.default_reminder_time)),
            database_path: other.database_path.or(self.database_path),
        }
    }
}

/// Validated settings for talking to the task backend.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub access_token: Option<String>,
    pub owner_id: String,
    pub poll_interval: Duration,
    pub default_reminder_time: ReminderTime,
    /// Local database location; the front-end picks a default when unset.
    pub database_path: Option<PathBuf>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("owner_id", &self.owner_id)
            .field("poll_interval", &self.poll_interval)
            .field("default_reminder_time", &self.default_reminder_time)
            .field("database_path", &self.database_path)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::try_from(ConfigLayer::from_env()?)
    }
}

impl TryFrom<ConfigLayer> for ClientConfig {
    type Error = ConfigError;

    fn try_from(layer: ConfigLayer) -> Result<Self, Self::Error> {
        let api_base_url =
            normalize_text_option(layer.api_base_url).ok_or(ConfigError::Missing("api_base_url"))?;
        if !is_http_url(&api_base_url) {
            return Err(ConfigError::Invalid(
                "api_base_url must start with http:// or https://".to_string(),
            ));
        }

        let owner_id =
            normalize_text_option(layer.owner_id).ok_or(ConfigError::Missing("owner_id"))?;

        let poll_interval_secs = layer
            .poll_interval_secs
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if !(1..=3_600).contains(&poll_interval_secs) {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be in [1, 3600]".to_string(),
            ));
        }

        let default_reminder_time = match normalize_text_option(layer.default_reminder_time) {
            Some(raw) => ReminderTime::parse(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("default_reminder_time '{raw}' is not HH:MM"))
            })?,
            None => ReminderTime::DEFAULT,
        };

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            access_token: normalize_text_option(layer.access_token),
            owner_id,
            poll_interval: Duration::from_secs(poll_interval_secs),
            default_reminder_time,
            database_path: layer.database_path,
        })
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}
