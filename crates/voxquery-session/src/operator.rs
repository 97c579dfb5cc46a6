//! The operator surface: what the session shows and what it asks.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use voxquery_core::types::FailureReason;

use crate::error::SessionError;

/// Something the session tells the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Capture for a new turn is starting.
    Listening,
    /// The utterance as transcribed.
    Transcribed(String),
    /// Capture produced no text.
    NoInput,
    /// The validated query for this turn.
    QueryGenerated(String),
    /// The turn ended without a query.
    TurnFailed(FailureReason),
    /// The continue answer was not `y` or `n`.
    InvalidDecision,
    /// The session is ending.
    Exiting,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Listening => write!(f, "Listening... Speak now!"),
            Notice::Transcribed(text) => write!(f, "Transcribed text: {}", text),
            Notice::NoInput => write!(f, "No voice input detected."),
            Notice::QueryGenerated(query) => write!(f, "Generated SQL query:\n{}", query),
            Notice::TurnFailed(reason) => match reason {
                FailureReason::CaptureTimeout => write!(f, "No voice input detected."),
                FailureReason::TranscriptionFailure(e) => {
                    write!(f, "Could not transcribe speech: {}", e)
                }
                FailureReason::GenerationFailure(e) => {
                    write!(f, "Failed to generate SQL query: {}", e)
                }
                FailureReason::InvalidSyntax => {
                    write!(f, "Generated query is not valid SQL; nothing was remembered.")
                }
            },
            Notice::InvalidDecision => write!(f, "Please enter 'y' or 'n'."),
            Notice::Exiting => write!(f, "Exiting..."),
        }
    }
}

/// Output to and line input from whoever drives the session.
pub trait Operator: Send {
    /// Show a notice.
    fn notify(&mut self, notice: &Notice) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Show `prompt` and read one line.
    ///
    /// The line terminator may or may not be present; `parse_decision`
    /// accepts both. Returns `Ok(None)` when the input is closed.
    fn prompt_line(
        &mut self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<String>, SessionError>> + Send;
}

// =============================================================================
// Scripted implementation
// =============================================================================

/// Operator that answers prompts from a fixed list of lines and records
/// everything it was shown.
///
/// Once the lines run out, input reads as closed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    lines: VecDeque<String>,
    notices: Vec<Notice>,
    prompts: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            notices: Vec::new(),
            prompts: Vec::new(),
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Operator for ScriptedOperator {
    async fn notify(&mut self, notice: &Notice) -> Result<(), SessionError> {
        self.notices.push(notice.clone());
        Ok(())
    }

    async fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>, SessionError> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}
