//! The seam between the engine and the hosted generation capability.
//!
//! `GenerationBackend` is object-safe so the engine can hold one shared
//! `dyn` handle for chat, streaming, and embeddings alike.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatCompletion, ChatRequest, EmbeddingsOutput};

// ─────────────────────────────────────────────────────────────────
// Backend Health & Capabilities
// ─────────────────────────────────────────────────────────────────

/// Result of a health probe
#[derive(Debug, Clone)]
pub struct BackendHealth {
    pub operational: bool,

    /// Probe failure detail, when not operational
    pub error: Option<String>,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self {
            operational: true,
            error: None,
        }
    }
}

/// What a backend can do, queried once at wiring time
#[derive(Debug, Clone)]
pub struct BackendCapabilities {
    pub name: &'static str,

    /// Whether chat_stream delivers real incremental fragments
    pub supports_streaming: bool,

    /// Whether the embeddings endpoint is supported
    pub supports_embeddings: bool,

    /// Largest prompt the provider accepts, in tokens
    pub max_context_length: u32,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            name: "unknown",
            supports_streaming: false,
            supports_embeddings: false,
            max_context_length: 8192,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Streaming Support
// ─────────────────────────────────────────────────────────────────

/// A text fragment produced during streaming generation
#[derive(Debug, Clone)]
pub struct StreamFragment {
    /// The fragment text
    pub text: String,

    /// Whether this is the final fragment
    pub is_final: bool,
}

/// Callback invoked for each streamed fragment.
///
/// Returning `false` asks the backend to stop delivering fragments; the
/// fragments already delivered remain valid. The stream is a cooperative
/// pull: the backend does not produce the next fragment until the callback
/// returns.
pub type StreamCallback = Box<dyn Fn(StreamFragment) -> bool + Send + Sync>;

// ─────────────────────────────────────────────────────────────────
// GenerationBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for generation backends
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short provider name, e.g. "openai" or "mock"
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> BackendCapabilities;

    fn supports_streaming(&self) -> bool {
        self.capabilities().supports_streaming
    }

    /// Probe the provider without issuing a generation
    async fn health_check(&self) -> Result<BackendHealth>;

    /// Execute a chat completion, returning the full answer at once
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion>;

    /// Execute a chat completion with streaming delivery.
    ///
    /// The returned completion's `text` equals the concatenation of every
    /// fragment passed to `callback`, in delivery order.
    async fn chat_stream(
        &self,
        request: ChatRequest,
        callback: StreamCallback,
    ) -> Result<ChatCompletion> {
        // Default implementation: non-streaming fallback, one fragment
        let completion = self.chat(request).await?;
        callback(StreamFragment {
            text: completion.text.clone(),
            is_final: true,
        });
        Ok(completion)
    }

    /// Generate embeddings for a batch of texts
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingsOutput>;
}

/// Shared handle the engine and index both hold
pub type SharedBackend = Arc<dyn GenerationBackend>;

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
