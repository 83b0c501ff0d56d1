// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! Configuration for the single-page-app server: where to listen, which
//! directory to serve and how long a graceful shutdown may take. Values are
//! validated when they are constructed, so a loaded [`ServerConfig`] is
//! always usable as is.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Result, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    error::{ServerError, ServerResult},
    runner::ShutdownConfig,
};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATIC_DIR: &str = "public";
const MAX_SHUTDOWN_TIMEOUT_SECONDS: u64 = 300;
const TESTING_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Listening port; 0 asks the OS for a free one and is reserved for tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerPort(u16);

impl ServerPort {
    /// Check `port` against the environment it will be used in
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 outside the testing environment
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        ensure!(
            port != 0 || environment == Environment::Testing,
            "port cannot be 0 in the {environment} environment"
        );
        Ok(Self(port))
    }

    /// Get the port value
    pub fn value(self) -> u16 {
        self.0
    }
}

/// Graceful shutdown deadline, between 1 and 300 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(
            seconds <= MAX_SHUTDOWN_TIMEOUT_SECONDS,
            "timeout cannot exceed {MAX_SHUTDOWN_TIMEOUT_SECONDS}"
        );
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Get the timeout value
    pub fn value(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self(ShutdownConfig::default().graceful_timeout)
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Production => "production",
            Environment::Development => "development",
            Environment::Testing => "testing",
        })
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Directory holding the single-page application bundle
    pub static_dir: PathBuf,
    /// Deadline for a graceful shutdown in seconds (validated range: 1-300)
    pub shutdown_timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort(DEFAULT_PORT),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            shutdown_timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment-specific files (config.{env}.json)
    /// 4. Environment variables with SERVER_ prefix
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", DEFAULT_PORT)?
            .set_default("static_dir", DEFAULT_STATIC_DIR)?
            .set_default(
                "shutdown_timeout_seconds",
                TimeoutSeconds::default().value().as_secs(),
            )?
            .set_default("environment", "development")?
            .add_source(File::with_name("config.json").required(false))
            .add_source(
                File::with_name(&format!("config.{}.json", env_var.to_lowercase())).required(false),
            )
            // `SERVER_SHUTDOWN_TIMEOUT_SECONDS` maps to `shutdown_timeout_seconds`
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        // the port rule depends on the environment, which is only known now
        ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;

        Ok(server_config)
    }

    /// Create configuration for tests, serving `static_dir` on an OS-assigned port
    pub fn for_testing(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort(0),
            static_dir: static_dir.into(),
            shutdown_timeout_seconds: TimeoutSeconds(TESTING_SHUTDOWN_TIMEOUT),
            environment: Environment::Testing,
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }

    /// Shutdown settings for the runner supervising this server
    pub fn shutdown_config(&self) -> ShutdownConfig {
        ShutdownConfig {
            graceful_timeout: self.shutdown_timeout_seconds.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn server_port_validation() {
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        assert!(ServerPort::new(3000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn timeout_deserialization_is_validated() {
        let timeout: TimeoutSeconds = serde_json::from_str("12").unwrap();
        assert_eq!(timeout.value(), Duration::from_secs(12));
        assert!(serde_json::from_str::<TimeoutSeconds>("0").is_err());
    }

    #[test]
    fn testing_config_binds_any_port_and_feeds_the_runner() {
        let config = ServerConfig::for_testing("dist");
        assert_eq!(config.socket_addr().port(), 0);
        assert!(config.socket_addr().ip().is_loopback());
        assert_eq!(config.static_dir, PathBuf::from("dist"));
        assert_eq!(
            config.shutdown_config().graceful_timeout,
            TESTING_SHUTDOWN_TIMEOUT
        );
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().port(), DEFAULT_PORT);
        assert_eq!(config.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(
            config.shutdown_config().graceful_timeout,
            ShutdownConfig::default().graceful_timeout
        );
    }

    #[test]
    fn port_deserializes_as_a_plain_number() {
        let port: ServerPort = serde_json::from_str("8080").unwrap();
        assert_eq!(port.value(), 8080);
    }
}
