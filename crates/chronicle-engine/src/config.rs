//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `chronicle.yaml` at the project root.
//! This module defines strongly-typed structs that mirror the YAML structure
//! and provides a loader. Every field is optional in the file; the defaults
//! reproduce the stock hourly-tick calendar.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `chronicle.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Simulated-time settings.
    #[serde(default)]
    pub time: TimeConfig,

    /// Snapshot history settings.
    #[serde(default)]
    pub history: HistoryConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Simulated-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeConfig {
    /// Number of ticks in one simulated year. One tick is one hour, so the
    /// stock value is 365 days of 24 hours.
    #[serde(default = "default_ticks_per_year")]
    pub ticks_per_year: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            ticks_per_year: default_ticks_per_year(),
        }
    }
}

/// Snapshot history configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of pre-tick snapshots retained for undo. Snapshots
    /// share structure with the live database, so depth is cheap.
    #[serde(default = "default_history_depth")]
    pub depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            depth: default_history_depth(),
        }
    }
}

const fn default_ticks_per_year() -> u64 {
    8_760
}

const fn default_history_depth() -> usize {
    32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_hourly_year() {
        let config = EngineConfig::default();
        assert_eq!(config.time.ticks_per_year, 8_760);
        assert_eq!(config.history.depth, 32);
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = EngineConfig::parse("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "time:\n  ticks_per_year: 24\n";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.time.ticks_per_year, 24);
        assert_eq!(config.history.depth, 32);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = EngineConfig::parse("time: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
