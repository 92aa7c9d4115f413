// Channel configuration: defaults, TOML file, environment overrides

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::endpoint::DEFAULT_PATH_PREFIX;
use crate::error::ConfigError;

pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "FALLWATCH_MAX_RECONNECT_ATTEMPTS";
pub const ENV_RECONNECT_DELAY_MS: &str = "FALLWATCH_RECONNECT_DELAY_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}

fn default_notification_icon() -> String {
    "/static/img/alert-icon.png".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            path_prefix: default_path_prefix(),
            notification_icon: default_notification_icon(),
        }
    }
}

impl ChannelConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `FALLWATCH_*` environment overrides on top of the current values.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| env::var(var).ok())
    }

    pub(crate) fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            self.max_reconnect_attempts = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_MAX_RECONNECT_ATTEMPTS.to_string(),
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(ENV_RECONNECT_DELAY_MS) {
            self.reconnect_delay_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_RECONNECT_DELAY_MS.to_string(),
                value: value.clone(),
            })?;
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.path_prefix, "/ws/fall_detection");
        assert_eq!(config.notification_icon, "/static/img/alert-icon.png");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ChannelConfig::from_toml_str("reconnect_delay_ms = 500\n").unwrap();
        assert_eq!(config.reconnect_delay_ms, 500);
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ChannelConfig {
            max_reconnect_attempts: 2,
            ..ChannelConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ChannelConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            ChannelConfig::from_toml_str("max_reconnect_attempts = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_reconnect_attempts = 9").unwrap();

        let config = ChannelConfig::load(file.path()).unwrap();
        assert_eq!(config.max_reconnect_attempts, 9);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_MAX_RECONNECT_ATTEMPTS, "1"),
            (ENV_RECONNECT_DELAY_MS, " 250 "),
        ]
        .into_iter()
        .collect();

        let config = ChannelConfig::default()
            .with_overrides_from(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_reconnect_attempts, 1);
        assert_eq!(config.reconnect_delay_ms, 250);
    }

    #[test]
    fn test_invalid_override() {
        let err = ChannelConfig::default()
            .with_overrides_from(|var| (var == ENV_RECONNECT_DELAY_MS).then(|| "soon".to_string()))
            .unwrap_err();

        match err {
            ConfigError::InvalidEnv { var, value } => {
                assert_eq!(var, ENV_RECONNECT_DELAY_MS);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
