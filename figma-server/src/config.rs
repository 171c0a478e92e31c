//! Command-line and environment configuration.
//!
//! Every setting resolves in this order: explicit flag, `-e KEY=VALUE`
//! override, process environment, default.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use figma_api::DEFAULT_API_BASE_URL;
use figma_core::{CorrelationMode, RelayConfig, DEFAULT_COMMAND_TIMEOUT};
use thiserror::Error;

/// Personal access token for the REST API.
pub const TOKEN_VAR: &str = "FIGMA_PERSONAL_ACCESS_TOKEN";
/// Relay listener port.
pub const PORT_VAR: &str = "WEBSOCKET_PORT";
/// Legacy alias of [`PORT_VAR`].
pub const LEGACY_PORT_VAR: &str = "PORT";
/// Deployment environment.
pub const ENV_VAR: &str = "FIGMA_MCP_ENV";
/// Legacy alias of [`ENV_VAR`].
pub const LEGACY_ENV_VAR: &str = "NODE_ENV";
/// Relay command timeout in milliseconds.
pub const TIMEOUT_VAR: &str = "FIGMA_COMMAND_TIMEOUT_MS";
/// REST API base URL.
pub const API_BASE_URL_VAR: &str = "FIGMA_API_BASE_URL";

/// Default relay listener port.
pub const DEFAULT_PORT: u16 = 3001;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `-e` argument without `=`.
    #[error("Invalid override '{0}': expected KEY=VALUE")]
    InvalidOverride(String),
    /// A value failed to parse.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
    /// Production without a token.
    #[error("{TOKEN_VAR} is required in production")]
    MissingToken,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    /// Local development (token optional).
    #[default]
    Development,
    /// Production (token required).
    Production,
    /// Tests (token optional).
    Test,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| ConfigError::InvalidValue {
            key: ENV_VAR,
            value: s.to_string(),
        })
    }
}

/// Correlation mode as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Correlation {
    /// Match responses by command name.
    #[default]
    CommandName,
    /// Match responses by generated request id.
    RequestId,
}

impl From<Correlation> for CorrelationMode {
    fn from(value: Correlation) -> Self {
        match value {
            Correlation::CommandName => Self::CommandName,
            Correlation::RequestId => Self::RequestId,
        }
    }
}

/// Figma MCP bridge: MCP over stdio, plugin relay over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "figma-mcp-server", version, about)]
pub struct Cli {
    /// Figma personal access token
    #[arg(long)]
    pub token: Option<String>,

    /// Relay listener port [env: WEBSOCKET_PORT, PORT] [default: 3001]
    #[arg(long)]
    pub port: Option<u16>,

    /// Relay listener address
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Deployment environment [env: FIGMA_MCP_ENV, NODE_ENV]
    #[arg(long, value_enum)]
    pub environment: Option<Environment>,

    /// Plugin command timeout in milliseconds [env: FIGMA_COMMAND_TIMEOUT_MS]
    #[arg(long)]
    pub command_timeout_ms: Option<u64>,

    /// How plugin responses are matched to commands
    #[arg(long, value_enum, default_value_t = Correlation::CommandName)]
    pub correlation: Correlation,

    /// Let in-flight commands run to their timeout when the plugin disconnects
    #[arg(long)]
    pub keep_pending_on_disconnect: bool,

    /// Figma REST API base URL [env: FIGMA_API_BASE_URL]
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Environment override, KEY=VALUE (repeatable)
    #[arg(short = 'e', value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// REST token; REST tools report "not configured" without one.
    pub token: Option<String>,
    /// Relay listener address.
    pub listen: SocketAddr,
    /// Deployment environment.
    pub environment: Environment,
    /// Relay behavior.
    pub relay: RelayConfig,
    /// REST API base URL.
    pub api_base_url: String,
}

impl Config {
    /// Resolve from the command line and the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve`].
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Resolve from the command line and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed `-e` overrides, unparsable
    /// values, or a missing token in production.
    pub fn resolve<F>(cli: Cli, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = parse_overrides(&cli.env)?;
        let lookup = |key: &str| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| env(key))
                .filter(|v| !v.is_empty())
        };

        let token = cli.token.filter(|t| !t.is_empty()).or_else(|| lookup(TOKEN_VAR));

        let port = match cli.port {
            Some(port) => port,
            None => match lookup(PORT_VAR).or_else(|| lookup(LEGACY_PORT_VAR)) {
                Some(value) => parse_value(PORT_VAR, &value)?,
                None => DEFAULT_PORT,
            },
        };

        let environment = match cli.environment {
            Some(environment) => environment,
            None => match lookup(ENV_VAR).or_else(|| lookup(LEGACY_ENV_VAR)) {
                Some(value) => value.parse()?,
                None => Environment::default(),
            },
        };

        let command_timeout = match cli.command_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => match lookup(TIMEOUT_VAR) {
                Some(value) => Duration::from_millis(parse_value(TIMEOUT_VAR, &value)?),
                None => DEFAULT_COMMAND_TIMEOUT,
            },
        };
        if command_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: TIMEOUT_VAR,
                value: "0".to_string(),
            });
        }

        let api_base_url = cli
            .api_base_url
            .or_else(|| lookup(API_BASE_URL_VAR))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if environment == Environment::Production && token.is_none() {
            return Err(ConfigError::MissingToken);
        }

        let relay = RelayConfig::default()
            .with_timeout(command_timeout)
            .with_correlation(cli.correlation.into())
            .with_fail_pending_on_disconnect(!cli.keep_pending_on_disconnect);

        Ok(Self {
            token,
            listen: SocketAddr::new(cli.host, port),
            environment,
            relay,
            api_base_url,
        })
    }
}

fn parse_overrides(pairs: &[String]) -> Result<HashMap<String, String>, ConfigError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(ConfigError::InvalidOverride(pair.clone())),
        })
        .collect()
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["figma-mcp-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults() {
        let config = Config::resolve(cli(&[]), no_env).expect("config");
        assert_eq!(config.listen, SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.token, None);
        assert_eq!(config.relay.command_timeout, DEFAULT_COMMAND_TIMEOUT);
        assert_eq!(config.relay.correlation, CorrelationMode::CommandName);
        assert!(config.relay.fail_pending_on_disconnect);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn environment_then_override_then_flag() {
        let env = |key: &str| match key {
            "WEBSOCKET_PORT" => Some("4000".to_string()),
            "FIGMA_PERSONAL_ACCESS_TOKEN" => Some("from-env".to_string()),
            _ => None,
        };

        let config = Config::resolve(cli(&[]), env).expect("config");
        assert_eq!(config.listen.port(), 4000);
        assert_eq!(config.token.as_deref(), Some("from-env"));

        let config = Config::resolve(
            cli(&["-e", "WEBSOCKET_PORT=4100", "-e", "FIGMA_PERSONAL_ACCESS_TOKEN=from-e"]),
            env,
        )
        .expect("config");
        assert_eq!(config.listen.port(), 4100);
        assert_eq!(config.token.as_deref(), Some("from-e"));

        let config = Config::resolve(
            cli(&["--port", "4200", "--token", "from-flag", "-e", "WEBSOCKET_PORT=4100"]),
            env,
        )
        .expect("config");
        assert_eq!(config.listen.port(), 4200);
        assert_eq!(config.token.as_deref(), Some("from-flag"));
    }

    #[test]
    fn legacy_aliases() {
        let env = |key: &str| match key {
            "PORT" => Some("5000".to_string()),
            "NODE_ENV" => Some("test".to_string()),
            _ => None,
        };
        let config = Config::resolve(cli(&[]), env).expect("config");
        assert_eq!(config.listen.port(), 5000);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn production_requires_token() {
        let err = Config::resolve(cli(&["--environment", "production"]), no_env)
            .expect_err("must fail");
        assert_eq!(err, ConfigError::MissingToken);

        let config = Config::resolve(
            cli(&["-e", "FIGMA_MCP_ENV=production", "--token", "t"]),
            no_env,
        )
        .expect("config");
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn relay_options() {
        let config = Config::resolve(
            cli(&[
                "--command-timeout-ms",
                "250",
                "--correlation",
                "request-id",
                "--keep-pending-on-disconnect",
            ]),
            no_env,
        )
        .expect("config");
        assert_eq!(config.relay.command_timeout, Duration::from_millis(250));
        assert_eq!(config.relay.correlation, CorrelationMode::RequestId);
        assert!(!config.relay.fail_pending_on_disconnect);
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            Config::resolve(cli(&["-e", "NOEQUALS"]), no_env).expect_err("must fail"),
            ConfigError::InvalidOverride("NOEQUALS".to_string())
        );
        assert!(matches!(
            Config::resolve(cli(&["-e", "WEBSOCKET_PORT=abc"]), no_env),
            Err(ConfigError::InvalidValue { key: PORT_VAR, .. })
        ));
        assert!(matches!(
            Config::resolve(cli(&["-e", "FIGMA_MCP_ENV=staging"]), no_env),
            Err(ConfigError::InvalidValue { key: ENV_VAR, .. })
        ));
        assert!(Config::resolve(cli(&["--command-timeout-ms", "0"]), no_env).is_err());
    }
}
