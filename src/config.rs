//! Configuration loading from TOML
//!
//! # Configuration File Format
//!
//! ```toml
//! [robot]
//! host = "192.168.42.2"      # omit to rely on broadcast discovery
//! port = 40923
//! command_timeout_ms = 30000 # must cover the longest chassis move
//! discovery_timeout_ms = 10000
//!
//! [runtime]
//! queue_capacity = 16
//! graceful_deadline_ms = 5000
//! ```
//!
//! Every field has a sensible default; an empty file is a valid
//! configuration that discovers the robot and uses stock timeouts.

use crate::commander::ConnectConfig;
use crate::error::{Error, Result};
use crate::proto::CTRL_PORT;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How to reach the robot
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Robot address; `None` waits for the broadcast announcement
    #[serde(default)]
    pub host: Option<String>,

    /// Command port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Command deadline in milliseconds.
    ///
    /// Movement commands block until the motion finishes, so this must
    /// cover the longest move the application issues.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// How long discovery waits for the robot's announcement, milliseconds
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

fn default_port() -> u16 {
    CTRL_PORT
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_discovery_timeout_ms() -> u64 {
    10_000
}

impl Default for RobotConfig {
    fn default() -> Self {
        RobotConfig {
            host: None,
            port: default_port(),
            command_timeout_ms: default_command_timeout_ms(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

/// Supervision and queue knobs
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of the push/event queues
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for workers before abandoning them,
    /// milliseconds
    #[serde(default = "default_graceful_deadline_ms")]
    pub graceful_deadline_ms: u64,
}

fn default_queue_capacity() -> usize {
    crate::runtime::queue::DEFAULT_CAPACITY
}

fn default_graceful_deadline_ms() -> u64 {
    5_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            queue_capacity: default_queue_capacity(),
            graceful_deadline_ms: default_graceful_deadline_ms(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = basic_toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.runtime.queue_capacity == 0 {
            return Err(Error::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.robot.command_timeout_ms == 0 {
            return Err(Error::Config(
                "command_timeout_ms must be positive".to_string(),
            ));
        }
        if self.robot.discovery_timeout_ms == 0 {
            return Err(Error::Config(
                "discovery_timeout_ms must be positive".to_string(),
            ));
        }
        if self.runtime.graceful_deadline_ms == 0 {
            return Err(Error::Config(
                "graceful_deadline_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Commander connection settings from this config
    pub fn connect_config(&self) -> ConnectConfig {
        ConnectConfig {
            host: self.robot.host.clone(),
            port: self.robot.port,
            timeout: Duration::from_millis(self.robot.command_timeout_ms),
        }
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.robot.discovery_timeout_ms)
    }

    pub fn graceful_deadline(&self) -> Duration {
        Duration::from_millis(self.runtime.graceful_deadline_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = basic_toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.robot.port, CTRL_PORT);
        assert!(config.robot.host.is_none());
        assert_eq!(config.runtime.queue_capacity, 16);
        assert_eq!(config.graceful_deadline(), Duration::from_secs(5));
    }

    #[test]
    fn test_full_config_parses() {
        let toml = r#"
            [robot]
            host = "192.168.42.2"
            command_timeout_ms = 60000

            [runtime]
            queue_capacity = 4
            graceful_deadline_ms = 2000
        "#;
        let config: Config = basic_toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.robot.host.as_deref(), Some("192.168.42.2"));
        let connect = config.connect_config();
        assert_eq!(connect.timeout, Duration::from_secs(60));
        assert_eq!(connect.port, CTRL_PORT);
        assert_eq!(config.runtime.queue_capacity, 4);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let toml = "[runtime]\nqueue_capacity = 0\n";
        let config: Config = basic_toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = "[robot]\ncommand_timeout_ms = 0\n";
        let config: Config = basic_toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load("/nonexistent/yantra.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
