use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Prompt messages
// =============================================================================

/// Author of a prompt message sent to the completion backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Fixes the assistant's behaviour for the whole request.
    System,
    /// Carries operator-originated content.
    User,
}

impl Role {
    /// Wire name of the role as used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role/content pair. An ordered `Vec<PromptMessage>` forms one
/// completion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// Turn outcomes
// =============================================================================

/// Why a turn did not produce a validated query.
///
/// Every variant is local to one turn; none of them ends the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureReason {
    /// No speech started within the listen timeout.
    CaptureTimeout,
    /// The speech-to-text engine failed.
    TranscriptionFailure(String),
    /// The completion backend failed, timed out, or returned nothing usable.
    GenerationFailure(String),
    /// The candidate was rejected by the syntax check.
    InvalidSyntax,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::CaptureTimeout => write!(f, "no speech detected before timeout"),
            FailureReason::TranscriptionFailure(e) => write!(f, "transcription failed: {}", e),
            FailureReason::GenerationFailure(e) => write!(f, "query generation failed: {}", e),
            FailureReason::InvalidSyntax => write!(f, "generated query is not valid SQL"),
        }
    }
}

/// Outcome of translating one utterance. Never partially populated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TranslationResult {
    Success { query: String },
    Failure { reason: FailureReason },
}

impl TranslationResult {
    pub fn success(query: impl Into<String>) -> Self {
        TranslationResult::Success {
            query: query.into(),
        }
    }

    pub fn failure(reason: FailureReason) -> Self {
        TranslationResult::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranslationResult::Success { .. })
    }

    /// The validated query, if the translation succeeded.
    pub fn query(&self) -> Option<&str> {
        match self {
            TranslationResult::Success { query } => Some(query),
            TranslationResult::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            TranslationResult::Success { .. } => None,
            TranslationResult::Failure { reason } => Some(reason),
        }
    }
}
