//! Conversation model: a titled, ordered message history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Greeting every conversation starts with, and returns to when cleared.
pub const SEED_GREETING: &str = "Hello! As your AI Legal Assistant, how can I help you today?";

/// Stable identifier of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Generate a UUIDv7 (time-ordered, globally unique).
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A conversation between the user and the assistant.
///
/// The message list is never empty: it always starts with the seed greeting.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation holding only the seed greeting.
    pub fn seeded(title: impl Into<String>) -> Self {
        Self {
            id: ConversationId::generate(),
            title: title.into(),
            messages: vec![Message::assistant(SEED_GREETING)],
            created_at: Utc::now(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop up to `count` trailing messages, never touching the seed.
    /// Returns how many were removed.
    pub(crate) fn pop_tail(&mut self, count: usize) -> usize {
        let keep = self.messages.len().saturating_sub(count).max(1);
        let removed = self.messages.len() - keep;
        self.messages.truncate(keep);
        removed
    }

    /// Truncate back to the seed message.
    pub(crate) fn reset(&mut self) {
        self.messages.truncate(1);
    }
}
