//! voxquery Session crate - the turn loop that ties capture, translation,
//! and the operator together.
//!
//! Each session moves through a strict state machine:
//! AwaitingInput -> Translating -> ReportingResult -> AwaitingContinueDecision,
//! then back to AwaitingInput or on to Terminated. A capture step that yields
//! no text goes straight to AwaitingContinueDecision.

pub mod controller;
pub mod decision;
pub mod error;
pub mod operator;
pub mod state;

pub use controller::{SessionController, SessionSummary, TurnBounds, TurnRecord};
pub use decision::{parse_decision, ContinueDecision, MalformedContinueInput, CONTINUE_PROMPT};
pub use error::SessionError;
pub use operator::{Notice, Operator, ScriptedOperator};
pub use state::{SessionState, StateMachine};
