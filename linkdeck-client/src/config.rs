//! Configuration loading for the Linkdeck client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// REST base, e.g. `http://localhost:3000`.
    pub api_base_url: String,
    /// WebSocket base, e.g. `ws://localhost:3000`.
    pub ws_base_url: String,
    /// Identity sent as `X-Actor-Id`.
    pub actor_id: Uuid,
    /// List id or slug to follow.
    pub list_key: String,
    pub request_timeout_ms: u64,
    /// Period of the self-healing full refetch.
    pub refresh_interval_ms: u64,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or LINKDECK_CLIENT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Load from `--config <path>` or `LINKDECK_CLIENT_CONFIG`, then apply
    /// a `--list <key>` override.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let mut config = Self::from_path(&path)?;
        if let Some(list_key) = arg_value("--list") {
            config.list_key = list_key;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.ws_base_url.starts_with("ws://") && !self.ws_base_url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue {
                field: "ws_base_url",
                reason: "must start with ws:// or wss://".to_string(),
            });
        }
        if self.list_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "list_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.initial_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.max_ms < self.reconnect.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.max_ms",
                reason: "must be >= initial_ms".to_string(),
            });
        }
        if self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.multiplier",
                reason: "must be >= 1.0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("LINKDECK_CLIENT_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    arg_value("--config").map(PathBuf::from)
}

fn arg_value(flag: &str) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_config() -> ClientConfig {
        ClientConfig {
            api_base_url: "http://localhost:3000".to_string(),
            ws_base_url: "ws://localhost:3000".to_string(),
            actor_id: Uuid::now_v7(),
            list_key: "reading".to_string(),
            request_timeout_ms: 5_000,
            refresh_interval_ms: 30_000,
            reconnect: ReconnectConfig {
                initial_ms: 250,
                max_ms: 5_000,
                multiplier: 1.5,
                jitter_ms: 100,
            },
        }
    }

    #[test]
    fn test_base_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_ws_scheme_is_checked() {
        let mut config = base_config();
        config.ws_base_url = "http://localhost:3000".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "ws_base_url", .. })
        ));
    }

    #[test]
    fn test_reconnect_bounds() {
        let mut config = base_config();
        config.reconnect.max_ms = 10;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.reconnect.multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path_parses_toml() {
        let actor = Uuid::now_v7();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
api_base_url = "http://localhost:3000"
ws_base_url = "ws://localhost:3000"
actor_id = "{actor}"
list_key = "team"
request_timeout_ms = 2000
refresh_interval_ms = 60000

[reconnect]
initial_ms = 100
max_ms = 1000
multiplier = 2.0
jitter_ms = 0
"#
        )
        .unwrap();

        let config = ClientConfig::from_path(file.path()).unwrap();
        assert_eq!(config.actor_id, actor);
        assert_eq!(config.list_key, "team");
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "api_base_url = \"x\"\ntheme = \"dark\"\n").unwrap();
        assert!(matches!(
            ClientConfig::from_path(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
