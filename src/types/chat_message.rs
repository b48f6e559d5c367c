use std::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque identity of a chat message.
///
/// Ids are assigned at creation and never change. They are used to find a
/// message again after the list around it has changed, never for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a bot reply is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Completion {
    /// The reply is still streaming, or the message was written by the user.
    #[default]
    Pending,
    /// The stream for the reply ended normally.
    Complete,
    /// The stream failed or was abandoned before it ended.
    Failed,
}

/// A message shown in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Identity used for lookups.
    pub id: MessageId,
    /// Message text; grows as deltas arrive for bot replies.
    pub text: String,
    /// True when the user wrote the message.
    pub is_user: bool,
    /// Creation time. Advisory only.
    pub timestamp: OffsetDateTime,
    /// Stream state of a bot reply. Always `Pending` for user messages.
    pub completion: Completion,
}

impl ChatMessage {
    /// A message written by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            is_user: true,
            timestamp: OffsetDateTime::now_utc(),
            completion: Completion::Pending,
        }
    }

    /// An empty bot reply waiting for its stream.
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::new(),
            text: String::new(),
            is_user: false,
            timestamp: OffsetDateTime::now_utc(),
            completion: Completion::Pending,
        }
    }

    /// A finished bot reply, such as a greeting or a non-streamed answer.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completion: Completion::Complete,
            ..Self::placeholder()
        }
    }

    /// Returns true once the reply's stream has ended normally.
    pub fn is_completed(&self) -> bool {
        self.completion == Completion::Complete
    }

    /// Returns true if the reply's stream failed.
    pub fn is_failed(&self) -> bool {
        self.completion == Completion::Failed
    }

    /// Returns true for a bot reply whose stream has not ended.
    pub fn is_in_flight(&self) -> bool {
        !self.is_user && self.completion == Completion::Pending
    }
}
