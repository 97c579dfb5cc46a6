//! Session state machine.
//!
//! Enforces the turn lifecycle:
//! - AwaitingInput -> Translating (utterance captured)
//! - AwaitingInput -> AwaitingContinueDecision (no usable input)
//! - Translating -> ReportingResult
//! - ReportingResult -> AwaitingContinueDecision
//! - AwaitingContinueDecision -> AwaitingInput (continue)
//! - AwaitingContinueDecision -> Terminated (stop)

use std::fmt;

use crate::error::SessionError;

/// Where a translation session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Capturing and transcribing the next utterance.
    AwaitingInput,
    /// Running the translation engine on an utterance.
    Translating,
    /// Showing the turn's outcome to the operator.
    ReportingResult,
    /// Waiting for the operator's continue/stop answer.
    AwaitingContinueDecision,
    /// The operator chose to stop. Final.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitingInput => write!(f, "AwaitingInput"),
            SessionState::Translating => write!(f, "Translating"),
            SessionState::ReportingResult => write!(f, "ReportingResult"),
            SessionState::AwaitingContinueDecision => write!(f, "AwaitingContinueDecision"),
            SessionState::Terminated => write!(f, "Terminated"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::AwaitingInput, SessionState::Translating)
                | (SessionState::AwaitingInput, SessionState::AwaitingContinueDecision)
                | (SessionState::Translating, SessionState::ReportingResult)
                | (SessionState::ReportingResult, SessionState::AwaitingContinueDecision)
                | (SessionState::AwaitingContinueDecision, SessionState::AwaitingInput)
                | (SessionState::AwaitingContinueDecision, SessionState::Terminated)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

/// State holder that validates every transition before applying it.
///
/// Owned by a single session controller; turns never overlap, so no lock.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SessionState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `AwaitingInput`.
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingInput,
        }
    }

    pub fn current(&self) -> SessionState {
        self.state
    }

    /// Attempt to transition to the target state.
    ///
    /// The state is left unchanged when the transition is not allowed.
    pub fn transition(&mut self, target: SessionState) -> Result<(), SessionError> {
        if self.state.can_transition_to(&target) {
            tracing::debug!("Session state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::AwaitingInput.to_string(), "AwaitingInput");
        assert_eq!(SessionState::Translating.to_string(), "Translating");
        assert_eq!(SessionState::ReportingResult.to_string(), "ReportingResult");
        assert_eq!(
            SessionState::AwaitingContinueDecision.to_string(),
            "AwaitingContinueDecision"
        );
        assert_eq!(SessionState::Terminated.to_string(), "Terminated");
    }

    #[test]
    fn test_valid_transitions() {
        use SessionState::*;

        assert!(AwaitingInput.can_transition_to(&Translating));
        assert!(AwaitingInput.can_transition_to(&AwaitingContinueDecision));
        assert!(Translating.can_transition_to(&ReportingResult));
        assert!(ReportingResult.can_transition_to(&AwaitingContinueDecision));
        assert!(AwaitingContinueDecision.can_transition_to(&AwaitingInput));
        assert!(AwaitingContinueDecision.can_transition_to(&Terminated));
    }

    #[test]
    fn test_invalid_transitions() {
        use SessionState::*;

        // Cannot skip reporting
        assert!(!Translating.can_transition_to(&AwaitingContinueDecision));
        assert!(!AwaitingInput.can_transition_to(&ReportingResult));

        // Only the decision state can end or restart the session
        assert!(!AwaitingInput.can_transition_to(&Terminated));
        assert!(!ReportingResult.can_transition_to(&AwaitingInput));

        // Terminated is final
        for target in [
            AwaitingInput,
            Translating,
            ReportingResult,
            AwaitingContinueDecision,
            Terminated,
        ] {
            assert!(!Terminated.can_transition_to(&target));
        }

        // No self loops
        assert!(!AwaitingInput.can_transition_to(&AwaitingInput));
        assert!(!Translating.can_transition_to(&Translating));
    }

    #[test]
    fn test_state_machine_full_turn() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.current(), SessionState::AwaitingInput);

        sm.transition(SessionState::Translating).unwrap();
        sm.transition(SessionState::ReportingResult).unwrap();
        sm.transition(SessionState::AwaitingContinueDecision).unwrap();
        sm.transition(SessionState::AwaitingInput).unwrap();
        sm.transition(SessionState::AwaitingContinueDecision).unwrap();
        sm.transition(SessionState::Terminated).unwrap();
        assert!(sm.current().is_terminal());
    }

    #[test]
    fn test_state_machine_invalid_transition() {
        let mut sm = StateMachine::new();
        let result = sm.transition(SessionState::ReportingResult);
        match result {
            Err(SessionError::InvalidTransition { from, to }) => {
                assert_eq!(from, SessionState::AwaitingInput);
                assert_eq!(to, SessionState::ReportingResult);
            }
            other => panic!("Expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(sm.current(), SessionState::AwaitingInput);
    }
}
