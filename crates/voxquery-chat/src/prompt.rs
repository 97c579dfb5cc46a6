//! Prompt composition.

use voxquery_core::config::DEFAULT_SYSTEM_PROMPT;
use voxquery_core::types::PromptMessage;

use crate::memory::ConversationMemory;

/// Label for the prior query in a follow-up prompt.
pub const PREVIOUS_QUERY_LABEL: &str = "Previous query: ";
/// Label for the new utterance in a follow-up prompt.
pub const NEW_REQUEST_LABEL: &str = "New request: ";

/// Builds the message sequence sent to the completion backend.
///
/// Output is a pure function of the utterance and the memory snapshot:
/// - one system message, always first
/// - with a prior query: a "previous" user message, then a "new request" one
/// - without: a single user message holding the utterance verbatim
#[derive(Debug, Clone)]
pub struct PromptComposer {
    system_prompt: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptComposer {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn compose(&self, utterance: &str, memory: &ConversationMemory) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(3);
        messages.push(PromptMessage::system(self.system_prompt.as_str()));

        match memory.read() {
            Some(previous) => {
                messages.push(PromptMessage::user(format!(
                    "{PREVIOUS_QUERY_LABEL}{previous}"
                )));
                messages.push(PromptMessage::user(format!("{NEW_REQUEST_LABEL}{utterance}")));
            }
            None => messages.push(PromptMessage::user(utterance)),
        }

        messages
    }
}
