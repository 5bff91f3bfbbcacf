//! Errors raised by strategies and strategy resolution.

use thiserror::Error;

use rebalancer_core::{DurationError, UnionError};

/// Errors a reconcile pass can hit while resolving or running strategies.
#[derive(Debug, Error)]
pub enum RebalanceError {
    /// The resource cannot be acted on as written.
    #[error("configuration error: {0}")]
    Config(String),

    /// Exactly one member was given but nothing is registered under it.
    #[error("no {family} strategy registered for {name:?}")]
    NotFound { family: &'static str, name: String },

    /// A metrics backend or target could not be read.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Writing the desired weight to the target failed.
    #[error("convergence error: {0}")]
    Convergence(String),
}

impl From<UnionError> for RebalanceError {
    fn from(e: UnionError) -> Self {
        RebalanceError::Config(e.to_string())
    }
}

impl From<DurationError> for RebalanceError {
    fn from(e: DurationError) -> Self {
        RebalanceError::Config(e.to_string())
    }
}

pub type RebalanceResult<T> = Result<T, RebalanceError>;
