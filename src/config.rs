//! Runtime configuration.
//!
//! Defaults match the shipped behavior; environment variables override them
//! for troubleshooting.

use std::time::Duration;
use thiserror::Error;

/// Name used for the startup registry value and the tray tooltip.
pub const APP_NAME: &str = "MicVolumeEnforcer";

/// Title of the control window.
pub const WINDOW_TITLE: &str = "Mic Volume Enforcer";

/// Default interval between two level-set calls.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

const TICK_ENV: &str = "MIC_ENFORCER_TICK_MS";
const SHOW_WINDOW_ENV: &str = "MIC_ENFORCER_SHOW_WINDOW";
const LOG_ENV: &str = "MIC_ENFORCER_LOG";

/// Configuration error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Tick interval must be greater than zero")]
    ZeroInterval,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcerConfig {
    /// How long the enforcement loop waits between two level-set calls
    pub tick_interval: Duration,

    /// Show the control window at launch instead of starting in the tray
    pub show_window: bool,

    /// Default tracing filter, overridden by RUST_LOG
    pub log_filter: String,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            show_window: false,
            log_filter: "info".to_string(),
        }
    }
}

impl EnforcerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(TICK_ENV) {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: TICK_ENV,
                value: value.clone(),
            })?;
            config.tick_interval = Duration::from_millis(millis);
        }

        if let Some(value) = lookup(SHOW_WINDOW_ENV) {
            config.show_window = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                key: SHOW_WINDOW_ENV,
                value,
            })?;
        }

        if let Some(value) = lookup(LOG_ENV) {
            if !value.trim().is_empty() {
                config.log_filter = value.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the enforcement loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EnforcerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EnforcerConfig::default());
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert!(!config.show_window);
    }

    #[test]
    fn test_overrides() {
        let config = EnforcerConfig::from_lookup(lookup(&[
            ("MIC_ENFORCER_TICK_MS", "250"),
            ("MIC_ENFORCER_SHOW_WINDOW", "yes"),
            ("MIC_ENFORCER_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert!(config.show_window);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_values() {
        let err = EnforcerConfig::from_lookup(lookup(&[("MIC_ENFORCER_TICK_MS", "fast")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "MIC_ENFORCER_TICK_MS",
                value: "fast".to_string()
            }
        );

        let err = EnforcerConfig::from_lookup(lookup(&[("MIC_ENFORCER_SHOW_WINDOW", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err =
            EnforcerConfig::from_lookup(lookup(&[("MIC_ENFORCER_TICK_MS", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroInterval);
    }
}
