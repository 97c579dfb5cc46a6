//! Session controller driving the turn loop.
//!
//! The `SessionController` moves one session through its state machine:
//! capture an utterance, translate it, report the outcome, then ask whether
//! to continue. Turn failures are reported and never end the session; only
//! the operator's "stop" (or closed input) does.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use voxquery_audio::{CaptureOutcome, SpeechCapture};
use voxquery_chat::{SyntaxChecker, TranslationEngine};
use voxquery_core::config::CaptureConfig;
use voxquery_core::types::{FailureReason, TranslationResult};
use voxquery_llm::CompletionBackend;

use crate::decision::{parse_decision, ContinueDecision, CONTINUE_PROMPT};
use crate::error::SessionError;
use crate::operator::{Notice, Operator};
use crate::state::{SessionState, StateMachine};

/// Bounds passed to the capture step on every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnBounds {
    /// Longest wait for speech to start.
    pub listen_timeout: Duration,
    /// Longest utterance once speech has started.
    pub max_duration: Duration,
}

impl Default for TurnBounds {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for TurnBounds {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            listen_timeout: Duration::from_secs(u64::from(config.listen_timeout_secs)),
            max_duration: Duration::from_secs(u64::from(config.max_utterance_secs)),
        }
    }
}

/// What one turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRecord {
    /// 1-based turn number within the session.
    pub number: u64,
    /// The transcribed utterance; `None` when capture produced no text.
    pub utterance: Option<String>,
    pub result: TranslationResult,
}

/// Running totals for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub turns: u64,
    pub successes: u64,
    pub failures: u64,
    /// Turns that ended before translation because nothing was heard.
    pub no_input: u64,
}

impl SessionSummary {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            turns: 0,
            successes: 0,
            failures: 0,
            no_input: 0,
        }
    }

    fn record(&mut self, result: &TranslationResult) {
        match result.failure_reason() {
            None => self.successes += 1,
            Some(FailureReason::CaptureTimeout) => self.no_input += 1,
            Some(_) => self.failures += 1,
        }
    }

    /// Seconds since the session started.
    pub fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds() as f32 / 1000.0
    }
}

/// Drives one translation session.
///
/// Owns its capture step, its translation engine (and with it the session's
/// conversation memory), and its operator.
pub struct SessionController<P, B, C, O> {
    state: StateMachine,
    capture: P,
    engine: TranslationEngine<B, C>,
    operator: O,
    bounds: TurnBounds,
    summary: SessionSummary,
}

impl<P, B, C, O> SessionController<P, B, C, O>
where
    P: SpeechCapture,
    B: CompletionBackend,
    C: SyntaxChecker,
    O: Operator,
{
    pub fn new(capture: P, engine: TranslationEngine<B, C>, operator: O, bounds: TurnBounds) -> Self {
        let summary = SessionSummary::new(Uuid::new_v4());
        tracing::info!(session_id = %summary.session_id, "Session created");
        Self {
            state: StateMachine::new(),
            capture,
            engine,
            operator,
            bounds,
            summary,
        }
    }

    pub fn id(&self) -> Uuid {
        self.summary.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    pub fn engine(&self) -> &TranslationEngine<B, C> {
        &self.engine
    }

    pub fn capture(&self) -> &P {
        &self.capture
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Run one turn, from capture to the point where a continue decision is
    /// needed.
    pub async fn run_turn(&mut self) -> Result<TurnRecord, SessionError> {
        if self.state.current() != SessionState::AwaitingInput {
            return Err(SessionError::InvalidTransition {
                from: self.state.current(),
                to: SessionState::Translating,
            });
        }

        self.summary.turns += 1;
        let number = self.summary.turns;
        tracing::info!(session_id = %self.id(), turn = number, "Turn started");

        self.operator.notify(&Notice::Listening).await?;
        let outcome = self
            .capture
            .capture_and_transcribe(self.bounds.listen_timeout, self.bounds.max_duration)
            .await;

        let (utterance, result) = match outcome {
            CaptureOutcome::Utterance(text) => {
                self.operator.notify(&Notice::Transcribed(text.clone())).await?;

                self.state.transition(SessionState::Translating)?;
                let result = self.engine.translate(&text).await;

                self.state.transition(SessionState::ReportingResult)?;
                let notice = match &result {
                    TranslationResult::Success { query } => Notice::QueryGenerated(query.clone()),
                    TranslationResult::Failure { reason } => Notice::TurnFailed(reason.clone()),
                };
                self.operator.notify(&notice).await?;

                self.state.transition(SessionState::AwaitingContinueDecision)?;
                (Some(text), result)
            }
            CaptureOutcome::NoSpeech => {
                self.state.transition(SessionState::AwaitingContinueDecision)?;
                self.operator.notify(&Notice::NoInput).await?;
                (None, TranslationResult::failure(FailureReason::CaptureTimeout))
            }
            CaptureOutcome::Failed(message) => {
                self.state.transition(SessionState::AwaitingContinueDecision)?;
                let reason = FailureReason::TranscriptionFailure(message);
                self.operator.notify(&Notice::TurnFailed(reason.clone())).await?;
                (None, TranslationResult::failure(reason))
            }
        };

        self.summary.record(&result);
        tracing::info!(
            session_id = %self.id(),
            turn = number,
            success = result.is_success(),
            "Turn finished"
        );

        Ok(TurnRecord {
            number,
            utterance,
            result,
        })
    }

    /// Ask whether to continue until a valid answer arrives, then move to
    /// the next turn or terminate. Closed input counts as "stop".
    pub async fn await_decision(&mut self) -> Result<ContinueDecision, SessionError> {
        if self.state.current() != SessionState::AwaitingContinueDecision {
            return Err(SessionError::InvalidTransition {
                from: self.state.current(),
                to: SessionState::AwaitingContinueDecision,
            });
        }

        let decision = loop {
            match self.operator.prompt_line(CONTINUE_PROMPT).await? {
                None => {
                    tracing::debug!("Operator input closed; stopping");
                    break ContinueDecision::Stop;
                }
                Some(line) => match parse_decision(&line) {
                    Ok(decision) => break decision,
                    Err(e) => {
                        tracing::debug!(error = %e, "Malformed continue input");
                        self.operator.notify(&Notice::InvalidDecision).await?;
                    }
                },
            }
        };

        match decision {
            ContinueDecision::Continue => self.state.transition(SessionState::AwaitingInput)?,
            ContinueDecision::Stop => {
                self.state.transition(SessionState::Terminated)?;
                self.operator.notify(&Notice::Exiting).await?;
            }
        }
        Ok(decision)
    }

    /// Run turns until the operator stops.
    pub async fn run(&mut self) -> Result<SessionSummary, SessionError> {
        loop {
            self.run_turn().await?;
            if self.await_decision().await? == ContinueDecision::Stop {
                break;
            }
        }

        let summary = self.summary.clone();
        tracing::info!(
            session_id = %summary.session_id,
            turns = summary.turns,
            successes = summary.successes,
            failures = summary.failures,
            no_input = summary.no_input,
            elapsed_secs = summary.elapsed_secs(),
            "Session terminated"
        );
        Ok(summary)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use voxquery_audio::ScriptedCapture;
    use voxquery_chat::SqlSyntaxChecker;
    use voxquery_llm::ScriptedCompletionBackend;

    use crate::operator::ScriptedOperator;

    type TestController = SessionController<
        ScriptedCapture,
        ScriptedCompletionBackend,
        SqlSyntaxChecker,
        ScriptedOperator,
    >;

    fn controller(
        captures: Vec<CaptureOutcome>,
        replies: Vec<&str>,
        answers: Vec<&str>,
    ) -> TestController {
        SessionController::new(
            ScriptedCapture::new(captures),
            TranslationEngine::with_backend(ScriptedCompletionBackend::with_texts(replies)),
            ScriptedOperator::new(answers),
            TurnBounds::default(),
        )
    }

    fn utterance(text: &str) -> CaptureOutcome {
        CaptureOutcome::Utterance(text.to_string())
    }

    #[test]
    fn test_turn_bounds_from_config() {
        let bounds = TurnBounds::default();
        assert_eq!(bounds.listen_timeout, Duration::from_secs(5));
        assert_eq!(bounds.max_duration, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_successful_turn_reports_query() {
        let mut session = controller(
            vec![utterance("show all customers")],
            vec!["SELECT * FROM customers;"],
            vec![],
        );

        let record = session.run_turn().await.unwrap();
        assert_eq!(record.number, 1);
        assert_eq!(record.utterance.as_deref(), Some("show all customers"));
        assert_eq!(record.result, TranslationResult::success("SELECT * FROM customers;"));
        assert_eq!(session.state(), SessionState::AwaitingContinueDecision);
        assert_eq!(
            session.operator().notices(),
            &[
                Notice::Listening,
                Notice::Transcribed("show all customers".to_string()),
                Notice::QueryGenerated("SELECT * FROM customers;".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_capture_receives_turn_bounds() {
        let mut session = controller(vec![CaptureOutcome::NoSpeech], vec![], vec![]);
        session.run_turn().await.unwrap();
        assert_eq!(
            session.capture().calls(),
            &[(Duration::from_secs(5), Duration::from_secs(10))]
        );
    }

    #[tokio::test]
    async fn test_transcription_failure_skips_translation() {
        let mut session = controller(
            vec![CaptureOutcome::Failed("decoder error".to_string())],
            vec!["SELECT 1;"],
            vec![],
        );

        let record = session.run_turn().await.unwrap();
        assert_eq!(
            record.result,
            TranslationResult::failure(FailureReason::TranscriptionFailure(
                "decoder error".to_string()
            ))
        );
        assert_eq!(session.engine().backend().call_count(), 0);
        assert_eq!(session.state(), SessionState::AwaitingContinueDecision);
        assert_eq!(session.summary().failures, 1);
    }

    #[tokio::test]
    async fn test_malformed_answers_reprompt() {
        let mut session = controller(vec![CaptureOutcome::NoSpeech], vec![], vec!["Y ", "maybe\n", "n\n"]);

        session.run_turn().await.unwrap();
        let decision = session.await_decision().await.unwrap();

        assert_eq!(decision, ContinueDecision::Stop);
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.operator().prompts().len(), 3);
        let invalid = session
            .operator()
            .notices()
            .iter()
            .filter(|n| **n == Notice::InvalidDecision)
            .count();
        assert_eq!(invalid, 2);
        assert_eq!(session.operator().notices().last(), Some(&Notice::Exiting));
    }

    #[tokio::test]
    async fn test_closed_input_stops() {
        let mut session = controller(vec![CaptureOutcome::NoSpeech], vec![], vec![]);
        let summary = session.run().await.unwrap();

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.no_input, 1);
    }

    #[tokio::test]
    async fn test_run_counts_outcomes() {
        let mut session = controller(
            vec![
                utterance("show total revenue by region"),
                utterance("now only for 2023"),
                CaptureOutcome::NoSpeech,
            ],
            vec![
                "SELECT region, SUM(revenue) FROM sales GROUP BY region;",
                "not sql at all",
            ],
            vec!["y", "Y\n", "n"],
        );

        let summary = session.run().await.unwrap();
        assert_eq!(summary.turns, 3);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.no_input, 1);
        assert_eq!(summary.session_id, session.id());
    }

    #[tokio::test]
    async fn test_no_turns_after_termination() {
        let mut session = controller(vec![], vec![], vec!["n"]);
        session.run().await.unwrap();

        let result = session.run_turn().await;
        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                from: SessionState::Terminated,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_decision_requires_finished_turn() {
        let mut session = controller(vec![], vec![], vec!["y"]);
        assert!(session.await_decision().await.is_err());
        assert_eq!(session.operator().prompts().len(), 0);
    }
}
