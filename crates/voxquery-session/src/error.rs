//! Error types for the session loop.

use voxquery_core::error::VoxQueryError;

use crate::state::SessionState;

/// Errors that end a session abnormally.
///
/// Turn-level problems are never errors; they are reported as failed turns.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
    #[error("operator I/O failed: {0}")]
    Operator(#[from] std::io::Error),
}

impl From<SessionError> for VoxQueryError {
    fn from(err: SessionError) -> Self {
        VoxQueryError::Session(err.to_string())
    }
}
