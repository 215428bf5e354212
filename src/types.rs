//! Request and response types for the generation backend
//!
//! These are the ephemeral composites built per turn: the engine composes a
//! `ChatRequest`, the backend answers with a `ChatCompletion` (or a stream of
//! fragments that concatenate to one).

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Chat Messages
// ─────────────────────────────────────────────────────────────────

/// Wire-level role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Generation Request
// ─────────────────────────────────────────────────────────────────

/// Sampling and limit parameters for a generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Nucleus sampling threshold
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 1.0,
            stop_sequences: vec![],
        }
    }
}

/// An ephemeral generation request composed per turn.
///
/// `messages` always carries at least the system message; under the replay
/// history policy it additionally carries prior user/assistant turns.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

impl ChatRequest {
    /// A request carrying only a system prompt (the source's single-shot form).
    pub fn system_only(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            params: GenerationParams::default(),
        }
    }

    /// Concatenation of all message contents, in order. Used by tests to
    /// assert composition ordering without caring about message boundaries.
    pub fn flattened_text(&self) -> String {
        let mut out = String::new();
        for msg in &self.messages {
            out.push_str(&msg.content);
            out.push('\n');
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────
// Generation Response
// ─────────────────────────────────────────────────────────────────

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max_tokens
    Length,
    /// Provider content filter
    ContentFilter,
}

/// Token usage reported by the API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A completed generation
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    /// The full generated text (for streams: the concatenated fragments)
    pub text: String,

    pub finish_reason: FinishReason,

    pub usage: TokenUsage,

    /// Wall-clock generation time
    pub generation_time_ms: u64,
}

// ─────────────────────────────────────────────────────────────────
// Embeddings
// ─────────────────────────────────────────────────────────────────

/// Result of an embeddings call
#[derive(Debug, Clone)]
pub struct EmbeddingsOutput {
    /// One vector per input text, in input order
    pub embeddings: Vec<Vec<f32>>,

    /// Dimensionality of the vectors
    pub dimensions: usize,

    pub usage: TokenUsage,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("be helpful");
        assert_eq!(msg.role, MessageRole::System);
        assert_eq!(msg.content, "be helpful");

        assert_eq!(ChatMessage::user("hi").role, MessageRole::User);
        assert_eq!(ChatMessage::assistant("hello").role, MessageRole::Assistant);
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: MessageRole = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, MessageRole::System);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_system_only_request() {
        let req = ChatRequest::system_only("instructions");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, MessageRole::System);
    }

    #[test]
    fn test_flattened_text_preserves_order() {
        let req = ChatRequest {
            messages: vec![
                ChatMessage::system("first"),
                ChatMessage::user("second"),
                ChatMessage::assistant("third"),
            ],
            params: GenerationParams::default(),
        };
        let flat = req.flattened_text();
        let a = flat.find("first").unwrap();
        let b = flat.find("second").unwrap();
        let c = flat.find("third").unwrap();
        assert!(a < b && b < c);
    }
}
