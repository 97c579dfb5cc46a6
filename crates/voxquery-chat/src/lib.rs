//! Contextual query translation for voxquery.
//!
//! Provides the conversation memory, prompt composition, syntax validation,
//! and the engine that chains them around a completion backend.

pub mod engine;
pub mod error;
pub mod memory;
pub mod prompt;
pub mod validator;

pub use engine::{TranslationEngine, DEFAULT_COMPLETION_TIMEOUT};
pub use error::TranslationError;
pub use memory::ConversationMemory;
pub use prompt::PromptComposer;
pub use validator::{QueryValidator, SqlSyntaxChecker, SyntaxChecker};
