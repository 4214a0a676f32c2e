//! Host configuration.
//!
//! # Responsibility
//! - Describe where module state lives and how the host logs.
//! - Load settings from `MODHOST_*` environment variables or a JSON document.
//!
//! # Invariants
//! - `db_path = None` selects an in-memory store.
//! - `log_dir`, when set, must be absolute (rolling file logs require it).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "MODHOST_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MODHOST_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MODHOST_LOG_DIR";
pub const ENV_ENFORCE_REQUIRES: &str = "MODHOST_ENFORCE_REQUIRES";

/// Runtime settings for one module host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// SQLite file holding manifests, configurations and the migration ledger.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Directory for rolling log files; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
    /// Refuse enable/disable transitions that break declared `requires`.
    pub enforce_requires: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            enforce_requires: true,
        }
    }
}

impl HostConfig {
    /// In-memory host with default logging and requirement checks.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed host with defaults for everything else.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Builds configuration from `MODHOST_*` variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = read(ENV_ENFORCE_REQUIRES) {
            config.enforce_requires = parse_flag(ENV_ENFORCE_REQUIRES, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; absent keys keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Malformed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(
            self.log_level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            return Err(ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
            });
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: "log_dir",
                    value: dir.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

/// Host configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Malformed(String),
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed host configuration: {message}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid host configuration value for `{key}`: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, HostConfig, ENV_DB_PATH, ENV_ENFORCE_REQUIRES, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_to_in_memory_with_enforcement() {
        let config = HostConfig::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(config, HostConfig::in_memory());
        assert!(config.db_path.is_none());
        assert!(config.enforce_requires);
    }

    #[test]
    fn reads_environment_overrides() {
        let config = HostConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, " /var/lib/assoc/modules.db "),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_ENFORCE_REQUIRES, "off"),
        ]))
        .expect("overrides");
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/assoc/modules.db"))
        );
        assert_eq!(config.log_level, "warn");
        assert!(!config.enforce_requires);
    }

    #[test]
    fn rejects_unparseable_flag() {
        let err = HostConfig::from_lookup(lookup(&[(ENV_ENFORCE_REQUIRES, "maybe")]))
            .expect_err("flag must be boolean");
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_ENFORCE_REQUIRES));
    }

    #[test]
    fn parses_partial_json_document() {
        let config = HostConfig::from_json_str(r#"{"db_path": "/tmp/m.db", "enforce_requires": false}"#)
            .expect("json config");
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/m.db")));
        assert!(!config.enforce_requires);
        assert_eq!(config.log_level, HostConfig::default().log_level);
    }

    #[test]
    fn rejects_relative_log_dir_and_bad_level() {
        let err = HostConfig::from_json_str(r#"{"log_dir": "logs"}"#).expect_err("relative dir");
        assert!(matches!(err, ConfigError::InvalidValue { key: "log_dir", .. }));

        let err = HostConfig::from_json_str(r#"{"log_level": "verbose"}"#).expect_err("bad level");
        assert!(matches!(err, ConfigError::InvalidValue { key: "log_level", .. }));

        let err = HostConfig::from_json_str("{").expect_err("malformed");
        assert!(matches!(err, ConfigError::Malformed(_)));
    }
}
