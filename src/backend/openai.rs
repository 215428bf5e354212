//! HTTP backend for any OpenAI-compatible endpoint (OpenAI itself, Ollama,
//! vLLM, LM Studio). Covers `/chat/completions` in plain and SSE-streamed
//! form, plus `/embeddings` for the retrieval index build.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OpenAiSettings;
use crate::error::{Error, Result};
use crate::types::{
    ChatCompletion, ChatRequest, EmbeddingsOutput, FinishReason, TokenUsage,
};

use super::{BackendCapabilities, BackendHealth, GenerationBackend, StreamCallback, StreamFragment};

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingsApiRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsApiResponse {
    data: Vec<EmbeddingData>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible API backend for generation and embeddings
pub struct OpenAiBackend {
    settings: OpenAiSettings,
    client: Client,
    total_requests: RwLock<u64>,
    total_tokens: RwLock<u64>,
}

impl OpenAiBackend {
    /// Create a new backend from the configured API settings
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %settings.base_url,
            model = %settings.model,
            "OpenAI-compatible backend created"
        );

        Ok(Self {
            settings,
            client,
            total_requests: RwLock::new(0),
            total_tokens: RwLock::new(0),
        })
    }

    /// Bearer header, omitted entirely for keyless local endpoints
    fn auth_header(&self) -> Option<String> {
        if self.settings.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.settings.api_key))
        }
    }

    fn wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
        request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> ChatCompletionRequest {
        let stop = if request.params.stop_sequences.is_empty() {
            None
        } else {
            Some(request.params.stop_sequences.clone())
        };

        ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: Self::wire_messages(request),
            max_tokens: Some(request.params.max_tokens),
            temperature: Some(request.params.temperature),
            top_p: Some(request.params.top_p),
            stop,
            stream: if stream { Some(true) } else { None },
        }
    }

    /// Send a POST with retry on transient errors (429, 5xx, connect, timeout).
    async fn send_with_retry(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response> {
        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                debug!(attempt, ?backoff, "Retrying after error");
                tokio::time::sleep(backoff).await;
            }

            let mut req = self.client.post(url).json(body);
            if let Some(ref auth) = self.auth_header() {
                req = req.header("Authorization", auth);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        *self.total_requests.write() += 1;
                        return Ok(response);
                    } else if status.as_u16() == 429 || status.is_server_error() {
                        let text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, "Retryable API error: {}", text);
                        last_error = Some(Error::generation(format!(
                            "API error {}: {}",
                            status, text
                        )));
                    } else {
                        // 4xx other than 429: retrying will not help
                        let text = response.text().await.unwrap_or_default();
                        return Err(Error::generation(format!("API error {}: {}", status, text)));
                    }
                }
                Err(e) => {
                    if e.is_timeout() || e.is_connect() {
                        warn!(attempt, error = %e, "Retryable connection error");
                        last_error = Some(Error::generation(format!("Connection error: {}", e)));
                    } else {
                        return Err(Error::generation(format!("Request error: {}", e)));
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::generation("All retry attempts exhausted".to_string())))
    }

    fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "openai",
            supports_streaming: true,
            supports_embeddings: true,
            max_context_length: 128_000,
        }
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        let url = format!("{}/models", self.settings.base_url);
        let mut req = self.client.get(&url);
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => Ok(BackendHealth {
                operational: true,
                error: None,
            }),
            Ok(resp) => Ok(BackendHealth {
                operational: false,
                error: Some(format!("API returned status {}", resp.status())),
            }),
            Err(e) => Ok(BackendHealth {
                operational: false,
                error: Some(format!("Connection failed: {}", e)),
            }),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.settings.base_url);
        let body = self.build_request_body(&request, false);

        let response = self.send_with_retry(&url, &body).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse API response: {}", e)))?;

        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| Error::generation("No choices in API response".to_string()))?;

        let text = choice.message.content.clone().unwrap_or_default();
        let finish_reason = Self::parse_finish_reason(choice.finish_reason.as_deref());

        let usage = if let Some(u) = parsed.usage {
            *self.total_tokens.write() += u.total_tokens as u64;
            TokenUsage::new(u.prompt_tokens, u.completion_tokens)
        } else {
            TokenUsage::default()
        };

        Ok(ChatCompletion {
            text,
            finish_reason,
            usage,
            generation_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        callback: StreamCallback,
    ) -> Result<ChatCompletion> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.settings.base_url);
        let body = self.build_request_body(&request, true);

        // Retries cover request establishment only; once fragments have been
        // delivered, a failure truncates the stream instead of restarting it.
        let response = self.send_with_retry(&url, &body).await?;

        let mut byte_stream = response.bytes_stream();
        let mut line_buffer = String::new();
        let mut full_text = String::new();
        let mut fragments = 0usize;
        let mut finish_reason = FinishReason::Stop;
        let mut done = false;

        'outer: while let Some(chunk) = byte_stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    if fragments == 0 {
                        return Err(Error::generation(format!("Stream error: {}", e)));
                    }
                    // Partial output was already delivered; keep it.
                    return Err(Error::StreamInterrupted {
                        message: e.to_string(),
                        received: fragments,
                    });
                }
            };

            line_buffer.push_str(&String::from_utf8_lossy(&bytes));

            // SSE events are newline-delimited; process every complete line.
            while let Some(pos) = line_buffer.find('\n') {
                let line = line_buffer[..pos].trim().to_string();
                line_buffer.drain(..=pos);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();

                if data == "[DONE]" {
                    done = true;
                    break 'outer;
                }

                let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
                    Ok(c) => c,
                    Err(e) => {
                        debug!(error = %e, "Skipping unparseable stream chunk");
                        continue;
                    }
                };

                for choice in &chunk.choices {
                    if let Some(reason) = choice.finish_reason.as_deref() {
                        finish_reason = Self::parse_finish_reason(Some(reason));
                    }
                    if let Some(ref content) = choice.delta.content {
                        if content.is_empty() {
                            continue;
                        }
                        full_text.push_str(content);
                        fragments += 1;
                        let proceed = callback(StreamFragment {
                            text: content.clone(),
                            is_final: false,
                        });
                        if !proceed {
                            done = true;
                            break 'outer;
                        }
                    }
                }
            }
        }

        if !done && fragments == 0 {
            return Err(Error::generation("Stream ended without content".to_string()));
        }

        callback(StreamFragment {
            text: String::new(),
            is_final: true,
        });

        debug!(fragments, chars = full_text.len(), "Stream complete");

        Ok(ChatCompletion {
            text: full_text,
            finish_reason,
            usage: TokenUsage::default(), // Streamed responses omit usage
            generation_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<EmbeddingsOutput> {
        let url = format!("{}/embeddings", self.settings.base_url);

        let request_body = EmbeddingsApiRequest {
            model: self.settings.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .send_with_retry(&url, &request_body)
            .await
            .map_err(|e| Error::retrieval(format!("Embeddings request failed: {}", e)))?;

        let parsed: EmbeddingsApiResponse = response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("Failed to parse embeddings response: {}", e)))?;

        let dimensions = parsed.data.first().map(|d| d.embedding.len()).unwrap_or(0);

        let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, 0))
            .unwrap_or_default();

        Ok(EmbeddingsOutput {
            embeddings,
            dimensions,
            usage,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
