//! Controller error types.

use std::time::Duration;

use thiserror::Error;

use rebalancer_state::StateError;
use rebalancer_strategy::RebalanceError;

/// Why a reconcile pass was abandoned.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Rebalance(#[from] RebalanceError),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("reconcile pass exceeded its {0:?} deadline")]
    Timeout(Duration),
}

pub type ControllerResult<T> = Result<T, ControllerError>;
