//! # Xiangqi Launcher
//!
//! Console front-end for the Xiangqi game client. It keeps one session with
//! the game server through `session_link`, forwards each stdin line to the
//! server as a JSON payload and prints every message received, including the
//! `connection_status` notifications produced while reconnecting.
//!
//! ## Quick Start
//!
//! ```bash
//! # Connect with the defaults (127.0.0.1:8080, TCP adapter)
//! xiangqi-launcher
//!
//! # Override the server endpoint
//! xiangqi-launcher --host 10.0.0.5 --port 9000
//!
//! # Use the C client library instead of the built-in transport
//! xiangqi-launcher --adapter native --library lib/libclient.so
//! ```
//!
//! ## Configuration
//!
//! Settings are read from a TOML file (default: `launcher.toml`, created with
//! defaults if missing), then `XIANGQI_HOST` / `XIANGQI_PORT`, then the
//! command line.
//!
//! ## Shutdown
//!
//! SIGINT, SIGTERM or end of input close the connection and stop every
//! background worker before the process exits.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;

pub use app::{build_adapter, DRAIN_INTERVAL};
pub use config::{AdapterKind, AdapterSettings, AppConfig, LoggingSettings};

/// Entry point called from `main`.
///
/// # Exit Codes
///
/// * **0**: Clean shutdown
/// * **1**: Invalid configuration, failed initial connection, or runtime error
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = match AppConfig::load_from_file(&args.config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {e}", args.config_path.display());
            std::process::exit(1);
        }
    };
    if let Err(e) = config.apply_overrides(&args) {
        eprintln!("❌ Invalid environment override: {e}");
        std::process::exit(1);
    }

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }
    logging::display_banner();

    match Application::new(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Launcher error: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start launcher: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_builds_application() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let app = Application::new(config).unwrap();
        assert!(!app.manager().is_connected());
        assert_eq!(app.manager().config().port, 8080);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.connection.port = 0;
        assert!(Application::new(config).is_err());
    }

    #[tokio::test]
    async fn test_config_file_and_cli_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");
        tokio::fs::write(&path, "[connection]\nhost = \"file-host\"\nport = 7000\n")
            .await
            .unwrap();

        let args = CliArgs::try_parse_from([
            "xiangqi-launcher",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "7100",
        ])
        .unwrap();
        let mut config = AppConfig::load_from_file(&args.config_path).await.unwrap();
        config.apply_cli(&args);

        assert_eq!(config.connection.host, "file-host");
        assert_eq!(config.connection.port, 7100);
    }
}
