//! Errors returned by counter requests.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("invalid counter configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("counter request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("counter service returned HTTP {status}")]
    Status { status: u16 },
    #[error("counter response is not usable JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("counter response has no `count` field")]
    MissingCount,
}

impl CounterError {
    /// True for failures of an individual request, which callers should show
    /// as "count unavailable". False only for configuration errors.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, CounterError::Config(_))
    }
}
