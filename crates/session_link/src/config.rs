//! Connection configuration.
//!
//! Holds the default server endpoint together with the timing knobs of the
//! polling and reconnection loops.

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the default server host.
pub const HOST_ENV: &str = "XIANGQI_HOST";
/// Environment variable overriding the default server port.
pub const PORT_ENV: &str = "XIANGQI_PORT";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_reconnect_timeout_secs() -> u64 {
    300
}

fn default_reconnect_interval_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_join_timeout_ms() -> u64 {
    1000
}

/// Connection settings used by [`ConnectionManager`](crate::ConnectionManager).
///
/// Only `host` and `port` are meant to change at runtime, and only through a
/// successful `connect` call which remembers them for later reconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Default server host used when `connect` is called without one
    #[serde(default = "default_host")]
    pub host: String,
    /// Default server port used when `connect` is called without one
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wall-clock bound on a single reconnection episode, in seconds
    #[serde(default = "default_reconnect_timeout_secs")]
    pub reconnect_timeout_secs: u64,
    /// Fixed delay between reconnection attempts, in seconds
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
    /// Poll loop tick, which also bounds loss detection latency
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long `disconnect` and `cleanup` wait for the workers to exit
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reconnect_timeout_secs: default_reconnect_timeout_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

impl ConnectionConfig {
    /// Default configuration with `XIANGQI_HOST` / `XIANGQI_PORT` applied.
    pub fn from_env() -> Result<Self, LinkError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Applies the host/port environment overrides in place.
    ///
    /// An unparsable port is rejected rather than silently ignored.
    pub fn apply_env(&mut self) -> Result<(), LinkError> {
        self.apply_overrides(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok())
    }

    fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<(), LinkError> {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            self.host = host.trim().to_string();
        }
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| LinkError::Config(format!("{PORT_ENV} is not a valid port: {port}")))?;
        }
        Ok(())
    }

    pub fn reconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.reconnect_timeout_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if every field is usable, or a [`LinkError::Config`]
    /// describing the first problem found.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.host.trim().is_empty() {
            return Err(LinkError::Config("host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(LinkError::Config("port must be between 1 and 65535".to_string()));
        }
        if self.reconnect_interval_secs == 0 {
            return Err(LinkError::Config(
                "reconnect_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.reconnect_timeout_secs < self.reconnect_interval_secs {
            return Err(LinkError::Config(format!(
                "reconnect_timeout_secs ({}) must be at least reconnect_interval_secs ({})",
                self.reconnect_timeout_secs, self.reconnect_interval_secs
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(LinkError::Config("poll_interval_ms must be greater than 0".to_string()));
        }
        if self.join_timeout_ms == 0 {
            return Err(LinkError::Config("join_timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.reconnect_timeout(), Duration::from_secs(300));
        assert_eq!(config.reconnect_interval(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.join_timeout(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = ConnectionConfig::default();
        config
            .apply_overrides(Some("10.0.0.7".into()), Some(" 9000 ".into()))
            .unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, 9000);

        // Blank host keeps the previous value
        config.apply_overrides(Some("  ".into()), None).unwrap();
        assert_eq!(config.host, "10.0.0.7");

        assert!(config.apply_overrides(None, Some("http".into())).is_err());
        assert!(config.apply_overrides(None, Some("70000".into())).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = ConnectionConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = ConnectionConfig::default();
        config.reconnect_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ConnectionConfig::default();
        config.reconnect_timeout_secs = 2;
        assert!(config.validate().is_err());

        let mut config = ConnectionConfig::default();
        config.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ConnectionConfig = serde_json::from_str(r#"{ "port": 9100 }"#).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.reconnect_timeout_secs, 300);
    }
}
