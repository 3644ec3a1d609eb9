//! Configuration management for the Xiangqi launcher.
//!
//! Settings come from a TOML file, then the `XIANGQI_HOST` / `XIANGQI_PORT`
//! environment variables, then command-line flags, each layer overriding the
//! previous one.

use crate::cli::CliArgs;
use serde::{Deserialize, Serialize};
use session_link::ConnectionConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server endpoint and reconnection timing
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Transport adapter selection
    #[serde(default)]
    pub adapter: AdapterSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which transport adapter performs the network I/O.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Built-in tokio TCP transport
    #[default]
    Tcp,
    /// C client shared library loaded at runtime
    Native,
}

impl FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "native" => Ok(Self::Native),
            other => Err(format!("Unknown adapter kind: {other}")),
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Native => f.write_str("native"),
        }
    }
}

fn default_library_path() -> PathBuf {
    PathBuf::from("lib").join("libclient.so")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSettings {
    #[serde(default)]
    pub kind: AdapterKind,
    /// Shared library loaded by the native adapter
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            kind: AdapterKind::default(),
            library_path: default_library_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, writing the defaults to `path`
    /// first if it does not exist yet.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies the environment then the command-line overrides.
    pub fn apply_overrides(&mut self, args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
        self.connection.apply_env()?;
        self.apply_cli(args);
        Ok(())
    }

    pub(crate) fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.connection.host = host.clone();
        }
        if let Some(port) = args.port {
            self.connection.port = port;
        }
        if let Some(kind) = args.adapter {
            self.adapter.kind = kind;
        }
        if let Some(library) = &args.library {
            self.adapter.library_path = library.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Validates the merged configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is usable, or an error message naming
    /// the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        self.connection.validate().map_err(|e| e.to_string())?;

        if self.adapter.kind == AdapterKind::Native
            && self.adapter.library_path.as_os_str().is_empty()
        {
            return Err("Native adapter requires a library_path".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.connection.host, "127.0.0.1");
        assert_eq!(config.connection.port, 8080);
        assert_eq!(config.connection.reconnect_timeout_secs, 300);
        assert_eq!(config.connection.reconnect_interval_secs, 5);
        assert_eq!(config.adapter.kind, AdapterKind::Tcp);
        assert_eq!(config.adapter.library_path, PathBuf::from("lib/libclient.so"));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.connection.port, 8080);

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("[connection]"));
        assert!(written.contains("[adapter]"));
        assert!(written.contains("[logging]"));

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.connection, config.connection);
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(
            file.path(),
            r#"
[connection]
host = "game.example.org"
reconnect_timeout_secs = 60

[adapter]
kind = "native"
library_path = "/usr/lib/libclient.so"
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.connection.host, "game.example.org");
        assert_eq!(config.connection.port, 8080);
        assert_eq!(config.connection.reconnect_timeout_secs, 60);
        assert_eq!(config.connection.reconnect_interval_secs, 5);
        assert_eq!(config.adapter.kind, AdapterKind::Native);
        assert_eq!(config.adapter.library_path, PathBuf::from("/usr/lib/libclient.so"));
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_toml() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "[connection\nport = ").await.unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());

        tokio::fs::write(file.path(), "[adapter]\nkind = \"udp\"\n").await.unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            host: Some("192.168.1.20".to_string()),
            port: Some(9100),
            adapter: Some(AdapterKind::Native),
            library: Some(PathBuf::from("client.dll")),
            log_level: Some("debug".to_string()),
            json_logs: true,
            ..CliArgs::default()
        };

        config.apply_cli(&args);
        assert_eq!(config.connection.host, "192.168.1.20");
        assert_eq!(config.connection.port, 9100);
        assert_eq!(config.adapter.kind, AdapterKind::Native);
        assert_eq!(config.adapter.library_path, PathBuf::from("client.dll"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_cli_without_overrides_keeps_file_values() {
        let mut config = AppConfig::default();
        config.connection.host = "from-file".to_string();
        config.logging.json_format = true;

        config.apply_cli(&CliArgs::default());
        assert_eq!(config.connection.host, "from-file");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));

        let mut config = AppConfig::default();
        config.connection.reconnect_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.adapter.kind = AdapterKind::Native;
        config.adapter.library_path = PathBuf::new();
        assert!(config.validate().unwrap_err().contains("library_path"));
    }

    #[test]
    fn test_adapter_kind_parse() {
        assert_eq!("tcp".parse::<AdapterKind>(), Ok(AdapterKind::Tcp));
        assert_eq!(" Native ".parse::<AdapterKind>(), Ok(AdapterKind::Native));
        assert!("udp".parse::<AdapterKind>().is_err());
        assert_eq!(AdapterKind::Native.to_string(), "native");
    }
}
