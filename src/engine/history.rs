//! Conversation history: the append-only transcript of one session.
//!
//! Owned exclusively by the session that created it: no global state, no
//! cross-session sharing. Messages alternate user → assistant; an assistant
//! message is appended only after its triggering user message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// Who produced a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────

/// Append-only message sequence scoped to one user session.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    session_id: Uuid,
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    /// Start an empty history for a fresh session.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            messages: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The full transcript, oldest first. Read-only: the only mutations are
    /// the engine's appends.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The trailing window of up to `limit` messages (0 = all).
    pub fn window(&self, limit: usize) -> &[ConversationMessage] {
        if limit == 0 || self.messages.len() <= limit {
            &self.messages
        } else {
            &self.messages[self.messages.len() - limit..]
        }
    }

    /// Append the user side of a turn.
    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        debug_assert!(
            self.messages
                .last()
                .map(|m| m.role == Role::Assistant)
                .unwrap_or(true),
            "user message must follow an assistant message or start the session"
        );
        self.messages.push(ConversationMessage::new(Role::User, content));
    }

    /// Append the assistant side of a turn. Only valid directly after the
    /// triggering user message.
    pub(crate) fn push_assistant(&mut self, content: impl Into<String>) {
        debug_assert!(
            self.messages
                .last()
                .map(|m| m.role == Role::User)
                .unwrap_or(false),
            "assistant message must follow a user message"
        );
        self.messages
            .push(ConversationMessage::new(Role::Assistant, content));
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_is_empty() {
        let history = ConversationHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = ConversationHistory::new();
        let b = ConversationHistory::new();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_alternating_appends() {
        let mut history = ConversationHistory::new();
        history.push_user("hello");
        history.push_assistant("hi there");
        history.push_user("how are you?");
        history.push_assistant("fine");

        assert_eq!(history.len(), 4);
        assert_eq!(history.messages()[0].role, Role::User);
        assert_eq!(history.messages()[1].role, Role::Assistant);
        assert_eq!(history.messages()[3].content, "fine");
    }

    #[test]
    fn test_window_limits_messages() {
        let mut history = ConversationHistory::new();
        for i in 0..5 {
            history.push_user(format!("q{}", i));
            history.push_assistant(format!("a{}", i));
        }

        assert_eq!(history.window(0).len(), 10);
        assert_eq!(history.window(4).len(), 4);
        assert_eq!(history.window(4)[0].content, "q3");
        assert_eq!(history.window(100).len(), 10);
    }

    #[test]
    fn test_messages_keep_chronological_order() {
        let mut history = ConversationHistory::new();
        history.push_user("first");
        history.push_assistant("second");

        let times: Vec<_> = history.messages().iter().map(|m| m.timestamp).collect();
        assert!(times[0] <= times[1]);
    }

    #[test]
    #[should_panic(expected = "assistant message must follow a user message")]
    #[cfg(debug_assertions)]
    fn test_assistant_first_is_rejected() {
        let mut history = ConversationHistory::new();
        history.push_assistant("premature");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
