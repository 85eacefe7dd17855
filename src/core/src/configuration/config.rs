use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use log::debug;
use serde::Deserialize;

use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::traffic_analysis::RiskPolicy;

// Longest burst window accepted; keeps the window representable as a chrono duration.
const MAX_BURST_WINDOW_SECS: u64 = 365 * 24 * 3600;

/// Application configuration structure that defines all runtime parameters.
///
/// Loaded from a TOML file where every table and field is optional, then adjusted with
/// command-line overrides (see [`CliArgs`]).
///
/// # Examples
///
/// ```
/// use riskgate::configuration::Config;
///
/// let config = Config::from_toml_str("[server]\nport = 6000\n").unwrap();
/// assert_eq!(config.server.port, 6000);
/// assert_eq!(config.risk.risk_threshold, 0.7);
/// ```
///
/// # Fields Overview
///
/// - `server`: listening address, port, frame size limit and idle timeout
/// - `risk`: history capacity, heuristic thresholds, weights and the block threshold
/// - `gating`: block notice text and the fixed next hop
/// - `cipher`: payload codec selection
/// - `web`: read-only status API
#[derive(Debug, PartialEq, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub risk: RiskPolicy,
    pub gating: GatingConfig,
    pub cipher: CipherConfig,
    pub web: WebConfig,
}

/// Command-line arguments.
///
/// Every flag overrides the matching value from the configuration file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "riskgate")]
#[command(version)]
#[command(about = "Relay server gating client frames on a live traffic risk score")]
pub struct CliArgs {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    pub config_file: Option<PathBuf>,

    /// Address the relay listens on.
    #[arg(long, env = "RISKGATE_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Port the relay listens on.
    #[arg(long, env = "RISKGATE_PORT")]
    pub port: Option<u16>,

    /// Seconds to wait for a client's next frame before closing it (0 disables).
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Serve the read-only status API.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub web_enabled: bool,

    /// Port of the status API.
    #[arg(long)]
    pub web_port: Option<u16>,
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the effective configuration: file (or defaults), then CLI overrides.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(addr) = &args.bind_address {
            self.server.bind_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(secs) = args.idle_timeout_secs {
            self.server.idle_timeout_secs = secs;
        }
        if args.web_enabled {
            self.web.enabled = true;
        }
        if let Some(port) = args.web_port {
            self.web.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_address.parse::<IpAddr>().map_err(|e| {
            ConfigError::BadIPFormatting(format!("{}: {}", self.server.bind_address, e))
        })?;

        if self.server.max_frame_size == 0 || self.server.max_frame_size > i32::MAX as usize {
            return Err(ConfigError::NotInRange(format!(
                "server.max_frame_size must be between 1 and {}",
                i32::MAX
            )));
        }

        let risk = &self.risk;
        if risk.history_capacity == 0 {
            return Err(ConfigError::NotInRange(
                "risk.history_capacity must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&risk.risk_threshold) {
            return Err(ConfigError::NotInRange(
                "risk.risk_threshold must be within [0, 1]".to_string(),
            ));
        }
        for (name, weight) in [
            ("payload_weight", risk.payload_weight),
            ("burst_weight", risk.burst_weight),
            ("port_weight", risk.port_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::NotInRange(format!(
                    "risk.{} must be a non-negative number",
                    name
                )));
            }
        }
        if risk.burst_window_secs > MAX_BURST_WINDOW_SECS {
            return Err(ConfigError::NotInRange(format!(
                "risk.burst_window_secs must not exceed {}",
                MAX_BURST_WINDOW_SECS
            )));
        }

        if self.cipher.kind == CipherKind::Xor && self.cipher.key.is_empty() {
            return Err(ConfigError::InvalidCipher(
                "cipher.key is required when cipher.kind = \"xor\"".to_string(),
            ));
        }

        if self.web.enabled && self.web.port != 0 && self.web.port == self.server.port {
            return Err(ConfigError::NotInRange(
                "web.port must differ from server.port".to_string(),
            ));
        }

        Ok(())
    }

    /// Relay listening address. Only valid on a validated configuration.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .server
            .bind_address
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::BadIPFormatting(e.to_string()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.server.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_under_test(extra: &[&str]) -> Result<CliArgs, clap::Error> {
        let mut argv = vec!["riskgate"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv)
    }

    #[test]
    fn defaults_match_relay_constants() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 5555);
        assert_eq!(config.server.max_frame_size, 1024 * 1024);
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.gating.default_route, "10.0.0.1");
        assert_eq!(config.cipher.kind, CipherKind::Plain);
        assert!(!config.web.enabled);
        assert_eq!(config.web.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn parses_every_table() {
        let raw = r#"
            [server]
            bind_address = "127.0.0.1"
            port = 6000
            max_frame_size = 4096
            idle_timeout_secs = 90

            [risk]
            history_capacity = 500
            risk_threshold = 0.5
            suspicious_ports = [22, 23, 3389]

            [gating]
            block_notice = "nope"
            default_route = "10.8.0.1"

            [cipher]
            kind = "xor"
            key = "s3cret"

            [web]
            enabled = true
            port = 8081
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.max_frame_size, 4096);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.risk.history_capacity, 500);
        assert_eq!(config.risk.risk_threshold, 0.5);
        assert_eq!(config.risk.burst_limit, 100);
        assert_eq!(config.risk.suspicious_ports, vec![22, 23, 3389]);
        assert_eq!(config.gating.block_notice, "nope");
        assert_eq!(config.gating.default_route, "10.8.0.1");
        assert_eq!(config.cipher.kind, CipherKind::Xor);
        assert!(config.web.enabled);
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:6000");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::from_toml_str("[server\nport = 1"),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[cipher]\nkind = \"rot13\""),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::from_toml_str("[server]\nbind_address = \"not-an-ip\""),
            Err(ConfigError::BadIPFormatting(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[server]\nmax_frame_size = 0"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[risk]\nhistory_capacity = 0"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[risk]\nrisk_threshold = 1.5"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[risk]\nburst_weight = -0.2"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[cipher]\nkind = \"xor\""),
            Err(ConfigError::InvalidCipher(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[web]\nenabled = true\nport = 5555"),
            Err(ConfigError::NotInRange(_))
        ));
    }

    #[test]
    fn reads_configuration_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 7000").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 7000\n[web]\nport = 9000").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let args = args_under_test(&[
            path.as_str(),
            "--bind-address",
            "127.0.0.1",
            "--port",
            "7100",
            "--idle-timeout-secs",
            "15",
            "--web-enabled",
        ])
        .unwrap_or_else(|e| panic!("{}", e));

        let config = Config::load(&args).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 7100);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(15)));
        assert!(config.web.enabled);
        assert_eq!(config.web.port, 9000);
    }

    #[test]
    fn cli_without_file_uses_defaults() {
        let args = args_under_test(&["--web-port", "8100"]).unwrap();
        let config = Config::load(&args).unwrap();
        assert_eq!(config.server.port, 5555);
        assert_eq!(config.web.port, 8100);
        assert!(!config.web.enabled);
    }

    #[test]
    fn cli_override_is_validated() {
        let args = args_under_test(&["--bind-address", "localhost"]).unwrap();
        assert!(matches!(
            Config::load(&args),
            Err(ConfigError::BadIPFormatting(_))
        ));
    }
}
