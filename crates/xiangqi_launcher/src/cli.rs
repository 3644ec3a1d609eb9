//! Command-line interface handling for the Xiangqi launcher.
//!
//! Every option here overrides the matching configuration file setting.

use crate::config::AdapterKind;
use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the server host
    pub host: Option<String>,
    /// Optional override for the server port
    pub port: Option<u16>,
    /// Optional override for the transport adapter
    pub adapter: Option<AdapterKind>,
    /// Optional override for the native client library path
    pub library: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

fn command() -> Command {
    Command::new("Xiangqi Launcher")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Console client that keeps a session with the Xiangqi game server")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("launcher.toml"),
        )
        .arg(
            Arg::new("host")
                .short('H')
                .long("host")
                .value_name("HOST")
                .help("Game server host"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Game server port")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("adapter")
                .short('a')
                .long("adapter")
                .value_name("KIND")
                .help("Transport adapter")
                .value_parser(["tcp", "native"]),
        )
        .arg(
            Arg::new("library")
                .long("library")
                .value_name("PATH")
                .help("Path to the native client library (native adapter only)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on invalid input.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list; the first item is the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("launcher.toml")),
            host: matches.get_one::<String>("host").cloned(),
            port: matches.get_one::<u16>("port").copied(),
            adapter: matches
                .get_one::<String>("adapter")
                .and_then(|kind| kind.parse().ok()),
            library: matches.get_one::<String>("library").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["xiangqi-launcher"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("launcher.toml"));
        assert!(args.host.is_none());
        assert!(args.port.is_none());
        assert!(args.adapter.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "xiangqi-launcher",
            "--config",
            "custom.toml",
            "--host",
            "10.0.0.5",
            "--port",
            "9000",
            "--adapter",
            "native",
            "--library",
            "/opt/xiangqi/libclient.so",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.adapter, Some(AdapterKind::Native));
        assert_eq!(args.library, Some(PathBuf::from("/opt/xiangqi/libclient.so")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(CliArgs::try_parse_from(["xiangqi-launcher", "--port", "0"]).is_err());
        assert!(CliArgs::try_parse_from(["xiangqi-launcher", "--port", "70000"]).is_err());
        assert!(CliArgs::try_parse_from(["xiangqi-launcher", "--adapter", "udp"]).is_err());
    }
}
