//! Conversation memory.
//!
//! Holds the most recent validated query of a session so the next utterance
//! can be read as a follow-up to it.

/// The single prior query retained by a translation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationMemory {
    last_query: Option<String>,
}

impl ConversationMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored query.
    ///
    /// Callers only pass validated, non-empty queries.
    pub fn update(&mut self, query: impl Into<String>) {
        self.last_query = Some(query.into());
    }

    /// The stored query, or `None` if nothing has been validated yet.
    pub fn read(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.last_query.is_none()
    }
}
