//! Translation engine: composes the prompt, calls the completion backend,
//! validates the candidate, and advances conversation memory.
//!
//! Memory only moves forward on a validated candidate. Backend errors,
//! timeouts, and rejected candidates all leave it exactly as it was.

use std::time::Duration;

use voxquery_core::types::{FailureReason, TranslationResult};
use voxquery_llm::CompletionBackend;

use crate::error::TranslationError;
use crate::memory::ConversationMemory;
use crate::prompt::PromptComposer;
use crate::validator::{QueryValidator, SqlSyntaxChecker, SyntaxChecker};

/// Default upper bound on one completion call.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns an utterance into a validated query, one session at a time.
///
/// Each engine owns its [`ConversationMemory`]; two engines never share one.
pub struct TranslationEngine<B, C = SqlSyntaxChecker> {
    backend: B,
    composer: PromptComposer,
    validator: QueryValidator<C>,
    memory: ConversationMemory,
    timeout: Duration,
}

impl<B: CompletionBackend> TranslationEngine<B, SqlSyntaxChecker> {
    /// Engine with the default system prompt, SQL validation, and timeout.
    pub fn with_backend(backend: B) -> Self {
        Self::new(
            backend,
            PromptComposer::default(),
            QueryValidator::default(),
            DEFAULT_COMPLETION_TIMEOUT,
        )
    }
}

impl<B: CompletionBackend, C: SyntaxChecker> TranslationEngine<B, C> {
    pub fn new(
        backend: B,
        composer: PromptComposer,
        validator: QueryValidator<C>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            composer,
            validator,
            memory: ConversationMemory::new(),
            timeout,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Translate one utterance.
    ///
    /// Never fails outright: every problem is reported as a
    /// [`TranslationResult::Failure`].
    pub async fn translate(&mut self, utterance: &str) -> TranslationResult {
        match self.generate(utterance).await {
            Ok(query) => {
                self.memory.update(query.as_str());
                tracing::info!(query_len = query.len(), "Query validated");
                TranslationResult::success(query)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Translation failed");
                TranslationResult::failure(FailureReason::from(err))
            }
        }
    }

    /// Produce a validated candidate without touching memory.
    async fn generate(&self, utterance: &str) -> Result<String, TranslationError> {
        if utterance.trim().is_empty() {
            return Err(TranslationError::EmptyUtterance);
        }

        let messages = self.composer.compose(utterance, &self.memory);
        tracing::debug!(
            messages = messages.len(),
            follow_up = !self.memory.is_empty(),
            "Prompt composed"
        );

        let reply = tokio::time::timeout(self.timeout, self.backend.complete(&messages))
            .await
            .map_err(|_| TranslationError::Timeout(self.timeout))??;

        let candidate = reply.trim();
        if !self.validator.is_valid(candidate) {
            return Err(TranslationError::InvalidSyntax);
        }
        Ok(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxquery_core::types::PromptMessage;
    use voxquery_llm::{LlmError, ScriptedCompletionBackend, ScriptedReply};

    const FIRST_QUERY: &str = "SELECT region, SUM(revenue) FROM sales GROUP BY region;";

    fn engine(replies: Vec<ScriptedReply>) -> TranslationEngine<ScriptedCompletionBackend> {
        TranslationEngine::with_backend(ScriptedCompletionBackend::new(replies))
    }

    fn text(s: &str) -> ScriptedReply {
        ScriptedReply::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_success_updates_memory() {
        let mut engine = engine(vec![text(FIRST_QUERY)]);

        let result = engine.translate("show total revenue by region").await;
        assert_eq!(result, TranslationResult::success(FIRST_QUERY));
        assert_eq!(engine.memory().read(), Some(FIRST_QUERY));
    }

    #[tokio::test]
    async fn test_candidate_is_trimmed_before_validation() {
        let mut engine = engine(vec![text("\n  SELECT * FROM customers;  \n")]);

        let result = engine.translate("show all customers").await;
        assert_eq!(result.query(), Some("SELECT * FROM customers;"));
        assert_eq!(engine.memory().read(), Some("SELECT * FROM customers;"));
    }

    #[tokio::test]
    async fn test_follow_up_prompt_uses_previous_query() {
        let mut engine = engine(vec![
            text(FIRST_QUERY),
            text("SELECT region, SUM(revenue) FROM sales WHERE year = 2023 GROUP BY region;"),
        ]);

        engine.translate("show total revenue by region").await;
        engine.translate("now only for 2023").await;

        let requests = engine.backend().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(
            requests[1][1..],
            [
                PromptMessage::user(format!("Previous query: {FIRST_QUERY}")),
                PromptMessage::user("New request: now only for 2023"),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_candidate_leaves_memory_unchanged() {
        let mut engine = engine(vec![text(FIRST_QUERY), text("not sql at all")]);

        engine.translate("show total revenue by region").await;
        let result = engine.translate("now only for 2023").await;

        assert_eq!(result, TranslationResult::failure(FailureReason::InvalidSyntax));
        assert_eq!(engine.memory().read(), Some(FIRST_QUERY));
    }

    #[tokio::test]
    async fn test_backend_error_is_generation_failure() {
        let mut engine = engine(vec![ScriptedReply::Fail(LlmError::Provider {
            message: "HTTP 503".to_string(),
        })]);

        let result = engine.translate("show all customers").await;
        match result.failure_reason() {
            Some(FailureReason::GenerationFailure(msg)) => assert!(msg.contains("HTTP 503")),
            other => panic!("expected generation failure, got {:?}", other),
        }
        assert!(engine.memory().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let backend = ScriptedCompletionBackend::new(vec![ScriptedReply::Delayed(
            Duration::from_secs(120),
            FIRST_QUERY.to_string(),
        )]);
        let mut engine: TranslationEngine<_, SqlSyntaxChecker> = TranslationEngine::new(
            backend,
            PromptComposer::default(),
            QueryValidator::default(),
            Duration::from_secs(5),
        );

        let result = engine.translate("show total revenue by region").await;
        assert_eq!(
            result,
            TranslationResult::failure(FailureReason::GenerationFailure(
                "completion timed out after 5s".to_string()
            ))
        );
        assert!(engine.memory().is_empty());
    }

    #[tokio::test]
    async fn test_empty_utterance_never_reaches_backend() {
        let mut engine = engine(vec![text(FIRST_QUERY)]);

        let result = engine.translate("   ").await;
        assert!(!result.is_success());
        assert_eq!(engine.backend().call_count(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_reply_is_invalid() {
        let mut engine = engine(vec![text("   \n")]);
        let result = engine.translate("show all customers").await;
        assert_eq!(result, TranslationResult::failure(FailureReason::InvalidSyntax));
    }

    #[tokio::test]
    async fn test_engines_do_not_share_memory() {
        let mut first = engine(vec![text(FIRST_QUERY)]);
        let second = engine(vec![]);

        first.translate("show total revenue by region").await;
        assert!(!first.memory().is_empty());
        assert!(second.memory().is_empty());
    }
}
