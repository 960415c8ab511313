//! Configuration management for chainscope
//!
//! Values come from an optional `config.toml`, then from the environment
//! (after loading `.env`). Missing sections fall back to local-node defaults.

use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::aggregator::{DEFAULT_MAX_BLOCK_WALK, DEFAULT_RECENT_LIMIT};
use crate::error::{ExplorerError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
}

/// Which upstreams the aggregator is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Full,
    ExecutionOnly,
}

impl std::str::FromStr for Mode {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Mode::Full),
            "execution-only" => Ok(Mode::ExecutionOnly),
            other => Err(ExplorerError::Config(format!(
                "unknown mode {:?} (expected \"full\" or \"execution-only\")",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub mode: Mode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            mode: Mode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_timeout", deserialize_with = "human_duration")]
    pub timeout: Duration,
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusConfig {
    /// Beacon node serving `/eth/v1/...`.
    #[serde(default = "default_beacon_url")]
    pub node_url: String,
    /// Beacon explorer serving `/api/v1/epoch/...`; the node URL when unset.
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default = "default_timeout", deserialize_with = "human_duration")]
    pub timeout: Duration,
}

impl ConsensusConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            node_url: default_beacon_url(),
            explorer_url: None,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_max_block_walk")]
    pub max_block_walk: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            max_block_walk: default_max_block_walk(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_beacon_url() -> String {
    "http://127.0.0.1:3500".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

fn default_max_block_walk() -> u64 {
    DEFAULT_MAX_BLOCK_WALK
}

fn human_duration<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides. `lookup` is `std::env::var` outside
    /// of tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ExplorerError::Config(format!("PORT {:?} is not a port", port)))?;
        }
        if let Some(mode) = lookup("EXPLORER_MODE") {
            self.server.mode = mode.parse()?;
        }

        if let Some(url) = lookup("EXECUTION_RPC_URL") {
            self.execution.rpc_url = url;
        } else if let Some(project_id) = lookup("INFURA_PROJECT_ID") {
            self.execution.rpc_url = format!("https://mainnet.infura.io/v3/{}", project_id);
        }

        if let Some(url) = lookup("BEACON_NODE_URL") {
            self.consensus.node_url = url;
        }
        if let Some(url) = lookup("BEACON_EXPLORER_URL") {
            self.consensus.explorer_url = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.execution.rpc_url.trim().is_empty() {
            return Err(ExplorerError::Config(
                "execution.rpc_url must be set".to_string(),
            ));
        }
        if self.server.mode == Mode::Full && self.consensus.node_url.trim().is_empty() {
            return Err(ExplorerError::Config(
                "consensus.node_url must be set in full mode".to_string(),
            ));
        }
        if self.explorer.recent_limit == 0 {
            return Err(ExplorerError::Config(
                "explorer.recent_limit must be at least 1".to_string(),
            ));
        }
        if self.explorer.max_block_walk == 0 {
            return Err(ExplorerError::Config(
                "explorer.max_block_walk must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads `path` (defaults when it does not exist), applies `.env` and
/// environment overrides, then validates.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        Config::from_toml(&fs::read_to_string(path)?)?
    } else {
        Config::default()
    };

    // A missing .env is fine
    let _ = dotenvy::dotenv();
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.mode, Mode::Full);
        assert_eq!(config.execution.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.consensus.timeout(), Duration::from_secs(5));
        assert_eq!(config.explorer.recent_limit, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080
            mode = "execution-only"

            [execution]
            rpc_url = "http://geth:8545"
            timeout = "2s 500ms"

            [consensus]
            node_url = "http://prysm:3500/"
            explorer_url = "https://beaconcha.in"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.mode, Mode::ExecutionOnly);
        assert_eq!(config.execution.timeout(), Duration::from_millis(2500));
        assert_eq!(config.consensus.explorer_url.as_deref(), Some("https://beaconcha.in"));
        assert_eq!(config.explorer.max_block_walk, 50);
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let err = Config::from_toml("[execution]\ntimeout = \"soon\"").unwrap_err();
        assert!(matches!(err, ExplorerError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "4000"),
            ("INFURA_PROJECT_ID", "abc123"),
            ("BEACON_EXPLORER_URL", "https://beaconcha.in"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.execution.rpc_url, "https://mainnet.infura.io/v3/abc123");
        assert_eq!(config.consensus.explorer_url.as_deref(), Some("https://beaconcha.in"));
    }

    #[test]
    fn test_explicit_rpc_url_beats_infura() {
        let mut config = Config::default();
        config
            .apply_env(|key| match key {
                "EXECUTION_RPC_URL" => Some("http://erigon:8545".to_string()),
                "INFURA_PROJECT_ID" => Some("abc123".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.execution.rpc_url, "http://erigon:8545");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.explorer.recent_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.execution.rpc_url = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.apply_env(|key| (key == "PORT").then(|| "http".to_string())).unwrap_err();
    }
}
