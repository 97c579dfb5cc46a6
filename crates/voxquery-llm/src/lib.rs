//! voxquery LLM crate - the chat-completion backend that turns a composed
//! prompt into generated query text.
//!
//! [`CompletionBackend`] is the seam the translation engine depends on.
//! [`OpenAiCompatibleBackend`] talks to any `/chat/completions` endpoint;
//! [`ScriptedCompletionBackend`] replays canned replies for tests and demos.

pub mod openai;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use voxquery_core::types::PromptMessage;

pub use openai::OpenAiCompatibleBackend;

// =============================================================================
// Errors
// =============================================================================

/// Errors from a completion backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("completion contained no message content")]
    EmptyResponse,

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("API key not set: environment variable {0} is missing or empty")]
    MissingApiKey(String),
}

// =============================================================================
// Traits
// =============================================================================

/// Sends an ordered prompt to a language model and returns the reply text.
pub trait CompletionBackend: Send + Sync {
    /// Request one completion. The reply is returned untrimmed.
    fn complete(
        &self,
        messages: &[PromptMessage],
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

// =============================================================================
// Scripted implementation
// =============================================================================

/// One canned backend behaviour.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail with this error.
    Fail(LlmError),
    /// Sleep before returning the text; used to exercise timeouts.
    Delayed(Duration, String),
}

/// Completion backend that replays scripted replies in order and records
/// every prompt it receives.
///
/// Once the script is exhausted every call fails with
/// [`LlmError::EmptyResponse`].
#[derive(Debug, Default)]
pub struct ScriptedCompletionBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedCompletionBackend {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Backend that answers each call with the next string.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedReply::Text(t.into())))
    }

    /// Every prompt received so far, in call order.
    pub fn requests(&self) -> Vec<Vec<PromptMessage>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_reply(&self, messages: &[PromptMessage]) -> Option<ScriptedReply> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        self.replies.lock().ok().and_then(|mut r| r.pop_front())
    }
}

impl CompletionBackend for ScriptedCompletionBackend {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        match self.next_reply(messages) {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(err)) => Err(err),
            Some(ScriptedReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(LlmError::EmptyResponse),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_backend_replays_in_order() {
        let backend = ScriptedCompletionBackend::with_texts(["SELECT 1", "SELECT 2"]);
        let prompt = vec![PromptMessage::user("anything")];

        assert_eq!(backend.complete(&prompt).await.unwrap(), "SELECT 1");
        assert_eq!(backend.complete(&prompt).await.unwrap(), "SELECT 2");
        assert_eq!(
            backend.complete(&prompt).await,
            Err(LlmError::EmptyResponse)
        );
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_backend_records_prompts() {
        let backend = ScriptedCompletionBackend::new(vec![ScriptedReply::Fail(
            LlmError::RateLimited,
        )]);
        let prompt = vec![
            PromptMessage::system("be helpful"),
            PromptMessage::user("list customers"),
        ];

        assert_eq!(backend.complete(&prompt).await, Err(LlmError::RateLimited));
        assert_eq!(backend.requests(), vec![prompt]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_backend_delay() {
        let backend = ScriptedCompletionBackend::new(vec![ScriptedReply::Delayed(
            Duration::from_secs(60),
            "SELECT 1".to_string(),
        )]);
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            backend.complete(&[PromptMessage::user("slow")]),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(LlmError::AuthenticationFailed.to_string(), "authentication failed");
        assert!(LlmError::MissingApiKey("OPENAI_API_KEY".into())
            .to_string()
            .contains("OPENAI_API_KEY"));
    }
}
