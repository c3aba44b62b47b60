//! Configuration module for the capitals chat server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Transport the server answers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Line-delimited stream protocol with a per-connection session
    #[default]
    Tcp,
    /// One datagram in, one datagram out
    Udp,
}

/// Command-line arguments for the chat server
#[derive(Parser, Debug)]
#[command(name = "capitals-chat")]
#[command(version)]
#[command(about = "EU capitals chat bot server (TCP or UDP)", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Transport to serve
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportType>,

    /// Maximum concurrent TCP connections (0 = unlimited)
    #[arg(short = 'm', long)]
    pub max_connections: Option<usize>,

    /// Longest line accepted without a newline, in bytes (0 = unlimited)
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub transport: TransportType,
    /// Maximum concurrent TCP connections (0 = unlimited)
    #[serde(default)]
    pub max_connections: usize,
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportType::default(),
            max_connections: 0,
            max_line_length: default_max_line_length(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    12000
}

fn default_max_line_length() -> usize {
    0 // unlimited
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub transport: TransportType,
    pub max_connections: usize,
    pub max_line_length: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let server = ServerConfig::default();
        Config {
            host: server.host,
            port: server.port,
            transport: server.transport,
            max_connections: server.max_connections,
            max_line_length: server.max_line_length,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from process arguments and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they point at, if any.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Config {
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            transport: cli.transport.unwrap_or(toml_config.server.transport),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            max_line_length: cli
                .max_line_length
                .unwrap_or(toml_config.server.max_line_length),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }

    /// `host:port` as given, for binding and log fields.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}
