//! Error types for health checking.

use thiserror::Error;

use crate::types::ShardId;

/// Result type alias for health check operations.
pub type HealthResult<T> = Result<T, HealthError>;

/// Failures that are not health verdicts.
///
/// An unhealthy task is reported through [`crate::HealthVerdict`]; these
/// variants cover caller contract violations and configuration problems.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("shard {shard_id} has no health port but HTTP checks are active")]
    MissingHealthPort { shard_id: ShardId },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
