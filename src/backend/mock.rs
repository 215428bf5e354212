//! Deterministic test backend: scripted replies and fragment sequences,
//! per-method failure injection, and call counting so tests can assert that
//! a code path issued (or, for the access gate, did not issue) backend
//! calls.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::{ChatCompletion, ChatRequest, EmbeddingsOutput, FinishReason, TokenUsage};

use super::{BackendCapabilities, BackendHealth, GenerationBackend, StreamCallback, StreamFragment};

// ─────────────────────────────────────────────────────────────────
// Mock Backend Configuration
// ─────────────────────────────────────────────────────────────────

/// Scripted behavior knobs for one test
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Canned reply returned by every chat call
    pub fixed_response: Option<String>,

    /// Fragment sequence used by chat_stream (falls back to splitting the
    /// response text when empty)
    pub scripted_fragments: Vec<String>,

    pub fail_chat: bool,
    pub fail_embeddings: bool,

    /// Fail the stream after delivering this many fragments
    pub fail_stream_after: Option<usize>,

    /// Dimensionality of the fake embeddings
    pub embedding_dims: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fixed_response: None,
            scripted_fragments: vec![],
            fail_chat: false,
            fail_embeddings: false,
            fail_stream_after: None,
            embedding_dims: 384,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

pub struct MockBackend {
    config: MockConfig,
    call_counts: RwLock<CallCounts>,
    last_request: RwLock<Option<ChatRequest>>,
}

#[derive(Debug, Default, Clone)]
struct CallCounts {
    chat: u32,
    chat_stream: u32,
    embed: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            call_counts: RwLock::new(CallCounts::default()),
            last_request: RwLock::new(None),
        }
    }

    /// Times a given method was invoked, for spy assertions
    pub fn call_count(&self, method: &str) -> u32 {
        let counts = self.call_counts.read();
        match method {
            "chat" => counts.chat,
            "chat_stream" => counts.chat_stream,
            "embed" => counts.embed,
            _ => 0,
        }
    }

    /// Total generation calls (streaming or not)
    pub fn generation_calls(&self) -> u32 {
        let counts = self.call_counts.read();
        counts.chat + counts.chat_stream
    }

    /// The most recent request seen by chat/chat_stream
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.read().clone()
    }

    pub fn reset_counts(&self) {
        *self.call_counts.write() = CallCounts::default();
    }

    fn generate_response(&self, request: &ChatRequest) -> String {
        if let Some(ref fixed) = self.config.fixed_response {
            return fixed.clone();
        }

        // Predictable response derived from the last message
        let last = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("Mock answer ({} chars of prompt considered)", last.len())
    }

    /// The fragments the stream will deliver for a request
    fn fragments_for(&self, request: &ChatRequest) -> Vec<String> {
        if !self.config.scripted_fragments.is_empty() {
            return self.config.scripted_fragments.clone();
        }

        // Split the canned response into word fragments
        let response = self.generate_response(request);
        response
            .split_inclusive(' ')
            .map(|s| s.to_string())
            .collect()
    }

    /// Deterministic embedding derived from a text hash, normalized to a
    /// unit vector so cosine similarity behaves.
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        let mut embedding = Vec::with_capacity(self.config.embedding_dims);
        for i in 0..self.config.embedding_dims {
            let byte_idx = i % 32;
            let value = (hash[byte_idx] as f32 / 255.0) * 2.0 - 1.0;
            embedding.push(value);
        }

        // Scale to unit length so cosine scores stay in [-1, 1]
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for e in &mut embedding {
                *e /= magnitude;
            }
        }

        embedding
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "mock",
            supports_streaming: true,
            supports_embeddings: true,
            max_context_length: 8192,
        }
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        Ok(BackendHealth::default())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion> {
        self.call_counts.write().chat += 1;
        *self.last_request.write() = Some(request.clone());

        if self.config.fail_chat {
            return Err(Error::generation("Mock failure".to_string()));
        }

        let text = self.generate_response(&request);
        let prompt_chars: usize = request.messages.iter().map(|m| m.content.len()).sum();

        Ok(ChatCompletion {
            text: text.clone(),
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::new((prompt_chars / 4) as u32, (text.len() / 4) as u32),
            generation_time_ms: 0,
        })
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        callback: StreamCallback,
    ) -> Result<ChatCompletion> {
        self.call_counts.write().chat_stream += 1;
        *self.last_request.write() = Some(request.clone());

        if self.config.fail_chat {
            return Err(Error::generation("Mock failure".to_string()));
        }

        let fragments = self.fragments_for(&request);
        let mut delivered = String::new();
        let mut count = 0usize;

        for fragment in &fragments {
            if let Some(limit) = self.config.fail_stream_after {
                if count >= limit {
                    return Err(Error::StreamInterrupted {
                        message: "Mock stream failure".to_string(),
                        received: count,
                    });
                }
            }

            delivered.push_str(fragment);
            count += 1;
            let proceed = callback(StreamFragment {
                text: fragment.clone(),
                is_final: false,
            });
            if !proceed {
                break;
            }
        }

        callback(StreamFragment {
            text: String::new(),
            is_final: true,
        });

        Ok(ChatCompletion {
            text: delivered,
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::default(),
            generation_time_ms: 0,
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<EmbeddingsOutput> {
        self.call_counts.write().embed += 1;

        if self.config.fail_embeddings {
            return Err(Error::retrieval("Mock embeddings failure".to_string()));
        }

        let embeddings: Vec<Vec<f32>> =
            texts.iter().map(|t| self.generate_embedding(t)).collect();

        Ok(EmbeddingsOutput {
            embeddings,
            dimensions: self.config.embedding_dims,
            usage: TokenUsage::default(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
