//! Error types for chainscope

use std::fmt;

/// Which upstream a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Execution,
    Consensus,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Upstream::Execution => write!(f, "execution client"),
            Upstream::Consensus => write!(f, "beacon client"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExplorerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{upstream} unavailable: {detail}")]
    UpstreamUnavailable { upstream: Upstream, detail: String },
    #[error("Malformed {upstream} response: {detail}")]
    MalformedUpstreamResponse { upstream: Upstream, detail: String },
    #[error("Consensus client is not configured")]
    ConsensusDisabled,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExplorerError {
    pub fn unavailable(upstream: Upstream, detail: impl Into<String>) -> Self {
        ExplorerError::UpstreamUnavailable {
            upstream,
            detail: detail.into(),
        }
    }

    pub fn malformed(upstream: Upstream, detail: impl Into<String>) -> Self {
        ExplorerError::MalformedUpstreamResponse {
            upstream,
            detail: detail.into(),
        }
    }

    /// Maps a reqwest failure onto the taxonomy. Body decoding problems mean
    /// the upstream answered but not in the expected shape.
    pub fn from_transport(upstream: Upstream, err: reqwest::Error) -> Self {
        if err.is_decode() {
            ExplorerError::malformed(upstream, err.to_string())
        } else if err.is_timeout() {
            ExplorerError::unavailable(upstream, format!("request timed out: {}", err))
        } else {
            ExplorerError::unavailable(upstream, err.to_string())
        }
    }

    /// True for failures caused by either upstream rather than by the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ExplorerError::UpstreamUnavailable { .. }
                | ExplorerError::MalformedUpstreamResponse { .. }
        )
    }
}

impl From<toml::de::Error> for ExplorerError {
    fn from(err: toml::de::Error) -> Self {
        ExplorerError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ExplorerError {
    fn from(err: std::io::Error) -> Self {
        ExplorerError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ExplorerError>;
