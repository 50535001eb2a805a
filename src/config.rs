//! Configuration management.
//!
//! Ambient tunables only: which executables to attach to, how often the
//! frame clock is polled, and runtime niceties. Macro sequences and keybind
//! definitions are embedded in the binary and deliberately not configurable
//! from a file.

use std::fs;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{FksError, Result};

/// Runtime configuration, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Candidate target executable names, in preference order. The first
    /// one found running is attached.
    #[serde(default = "default_target_processes")]
    pub target_processes: Vec<String>,

    /// Fixed frame-clock polling interval.
    #[serde(
        default = "default_poll_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,

    /// Raise the process priority class at startup.
    #[serde(default = "default_true")]
    pub elevate_priority: bool,

    /// Enable debug-level diagnostics.
    #[serde(default)]
    pub verbose: bool,
}

fn default_target_processes() -> Vec<String> {
    vec!["GTA5_Enhanced.exe".to_string(), "GTA5.exe".to_string()]
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(1)
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_processes: default_target_processes(),
            poll_interval: default_poll_interval(),
            elevate_priority: true,
            verbose: false,
        }
    }
}

impl Config {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).map_err(|e| FksError::config_load(path, e.to_string()))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| FksError::config_load(path, e.to_string()))?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| FksError::config_save(path, e.to_string()))?;
        fs::write(path, contents).map_err(|e| FksError::config_save(path, e.to_string()))?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.target_processes.is_empty() {
            return Err(FksError::config_validation(
                "target_processes cannot be empty",
            ));
        }
        if self.target_processes.iter().any(|name| name.trim().is_empty()) {
            return Err(FksError::config_validation(
                "target process names cannot be blank",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(FksError::config_validation(
                "poll_interval must be at least 1ms",
            ));
        }
        Ok(())
    }
}

/// Parses a duration string: a bare number is milliseconds, with optional
/// `ms`, `s`, or `m` suffix (case-insensitive, surrounding whitespace ok).
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(FksError::invalid_duration(value, "empty duration"));
    }

    let (number, multiplier_ms) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60_000)
    } else {
        (trimmed.as_str(), 1)
    };

    let amount: u64 = number
        .trim()
        .parse()
        .map_err(|_| FksError::invalid_duration(value, "not a non-negative number"))?;

    Ok(Duration::from_millis(amount * multiplier_ms))
}

fn serialize_duration<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    let value = String::deserialize(deserializer)?;
    parse_duration(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_processes.len(), 2);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert!(config.elevate_priority);
        assert!(!config.verbose);
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0ms").unwrap(), Duration::from_millis(0));
        assert_eq!(parse_duration("1000").unwrap(), Duration::from_millis(1000));
        assert_eq!(parse_duration("5S").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("1000x").is_err());
        assert!(parse_duration("-1000ms").is_err());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config {
            target_processes: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.target_processes = vec!["   ".to_string()];
        assert!(config.validate().is_err());

        config.target_processes = vec!["game.exe".to_string()];
        config.poll_interval = Duration::from_millis(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_deserialize_explicit_fields() {
        let json = r#"
        {
            "target_processes": ["notepad.exe"],
            "poll_interval": "2ms",
            "elevate_priority": false,
            "verbose": true
        }
        "#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.target_processes, vec!["notepad.exe"]);
        assert_eq!(config.poll_interval, Duration::from_millis(2));
        assert!(!config.elevate_priority);
        assert!(config.verbose);
    }
}
