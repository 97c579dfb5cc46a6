//! Error types for the translation engine.

use std::time::Duration;

use voxquery_core::types::FailureReason;
use voxquery_llm::LlmError;

/// Why one translation attempt did not produce a validated query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("utterance is empty")]
    EmptyUtterance,
    #[error("completion backend error: {0}")]
    Backend(#[from] LlmError),
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("candidate failed syntax validation")]
    InvalidSyntax,
}

impl From<TranslationError> for FailureReason {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::InvalidSyntax => FailureReason::InvalidSyntax,
            other => FailureReason::GenerationFailure(other.to_string()),
        }
    }
}
