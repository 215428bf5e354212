//! Conversation engine: the core retrieval-and-generation state machine.
//!
//! Per turn: `Idle → AwaitingRetrieval → AwaitingGeneration → Idle`. One
//! turn is fully processed before the next begins; the only suspension
//! points are the retrieval call and the generation call. The engine owns
//! no ambient state: the index and backend are injected handles, the
//! history is an explicit value passed into every call.

mod history;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{GenerationBackend, SharedBackend, StreamFragment};
use crate::config::ChatSettings;
use crate::error::{Error, Result};
use crate::gate::AccessGate;
use crate::index::{DocumentStore, RetrievalContext, RetrievalIndex, SharedIndex, VectorIndex};
use crate::persona::Persona;
use crate::types::{ChatMessage, ChatRequest, GenerationParams};

pub use history::{ConversationHistory, ConversationMessage, Role};

// ─────────────────────────────────────────────────────────────────
// Turn Outcomes
// ─────────────────────────────────────────────────────────────────

/// Whether prior turns are replayed into the generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Send only the current query with fresh context (the source app's
    /// observed behavior).
    SingleTurn,
    /// Replay the windowed transcript for true multi-turn memory.
    Replay,
}

/// Result of submitting one turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant answered; in the history-aware path the message was
    /// appended to the transcript.
    Reply { message: ConversationMessage },

    /// The query was empty after trimming. User-correctable, not an error:
    /// nothing changed, nothing was called.
    EmptyInput,

    /// Generation failed after the user message was accepted. The stored
    /// message holds partial stream output or an error placeholder so the
    /// transcript matches what the user saw.
    Failed {
        message: ConversationMessage,
        error: Error,
    },
}

/// Presentation callback for streamed fragments.
pub type FragmentSink = Arc<dyn Fn(&str) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────
// Session Bootstrap
// ─────────────────────────────────────────────────────────────────

/// Open an authenticated session: gate first, then document loading and the
/// one-time index build.
///
/// The gate check strictly precedes all other work; a wrong secret returns
/// before a single document is read or the backend is touched, so no
/// document content leaks and no API quota is spent.
pub async fn open_session(
    gate: &AccessGate,
    submitted_secret: &str,
    docs_dir: &std::path::Path,
    backend: SharedBackend,
    retrieval: &crate::config::RetrievalSettings,
    chat: &ChatSettings,
) -> Result<ConversationEngine> {
    gate.verify(submitted_secret)?;

    let store = DocumentStore::load(docs_dir)?;
    let index = VectorIndex::build(&store, backend.clone(), retrieval).await?;
    info!(chunks = index.chunk_count(), "Session opened");

    Ok(ConversationEngine::new(Arc::new(index), backend, chat))
}

// ─────────────────────────────────────────────────────────────────
// Conversation Engine
// ─────────────────────────────────────────────────────────────────

/// Composes persona instruction, retrieved context, and conversation state
/// into generation requests, and applies the results to the history.
pub struct ConversationEngine {
    index: SharedIndex,
    backend: SharedBackend,
    policy: HistoryPolicy,
    max_history_messages: usize,
    params: GenerationParams,
}

impl ConversationEngine {
    pub fn new(index: SharedIndex, backend: SharedBackend, settings: &ChatSettings) -> Self {
        let policy = if settings.replay_history {
            HistoryPolicy::Replay
        } else {
            HistoryPolicy::SingleTurn
        };

        Self {
            index,
            backend,
            policy,
            max_history_messages: settings.max_history_messages,
            params: GenerationParams::default(),
        }
    }

    pub fn history_policy(&self) -> HistoryPolicy {
        self.policy
    }

    // ─────────────────────────────────────────────────────────────
    // Prompt Composition
    // ─────────────────────────────────────────────────────────────

    /// The single-shot prompt: instruction, retrieved context, query, in
    /// that order, as one system message.
    pub fn compose_single_shot(persona: &Persona, context: &str, query: &str) -> String {
        format!(
            "{}\n\nRelevant info: {}\n\nUser: {}",
            persona.system_instruction.trim(),
            context,
            query
        )
    }

    /// The history-aware system prompt: instruction plus retrieved context.
    pub fn compose_system_prompt(persona: &Persona, context: &str) -> String {
        format!(
            "{}\n\nRelevant info: {}",
            persona.system_instruction.trim(),
            context
        )
    }

    /// Build the generation request for a history-aware turn. The history
    /// snapshot is taken before the current query is appended.
    fn compose_request(
        &self,
        persona: &Persona,
        context: &RetrievalContext,
        history: &ConversationHistory,
        query: &str,
    ) -> ChatRequest {
        let system = Self::compose_system_prompt(persona, &context.render());
        let mut messages = vec![ChatMessage::system(system)];

        if self.policy == HistoryPolicy::Replay {
            for prior in history.window(self.max_history_messages) {
                let msg = match prior.role {
                    Role::User => ChatMessage::user(prior.content.clone()),
                    Role::Assistant => ChatMessage::assistant(prior.content.clone()),
                };
                messages.push(msg);
            }
        }

        messages.push(ChatMessage::user(query.to_string()));

        ChatRequest {
            messages,
            params: self.params.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Single-Shot Query
    // ─────────────────────────────────────────────────────────────

    /// Answer one query with fresh context and no conversation state.
    pub async fn ask(&self, persona: &Persona, query: &str) -> Result<TurnOutcome> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Empty query, nothing to do");
            return Ok(TurnOutcome::EmptyInput);
        }

        debug!(persona = %persona.id, phase = "awaiting_retrieval", "Turn started");
        let context = self.index.query(query).await?;

        let prompt = Self::compose_single_shot(persona, &context.render(), query);
        let mut request = ChatRequest::system_only(prompt);
        request.params = self.params.clone();

        debug!(phase = "awaiting_generation", "Context retrieved");
        let completion = self.backend.chat(request).await?;

        debug!(phase = "idle", chars = completion.text.len(), "Turn complete");
        Ok(TurnOutcome::Reply {
            message: assistant_message(completion.text),
        })
    }

    // ─────────────────────────────────────────────────────────────
    // History-Aware Turn
    // ─────────────────────────────────────────────────────────────

    /// Submit one turn of a chat session.
    ///
    /// Exactly one user message and one assistant message (answer or error
    /// placeholder) are appended per accepted turn. A retrieval failure
    /// leaves the history untouched and the turn may simply be resubmitted.
    pub async fn submit_turn(
        &self,
        persona: &Persona,
        history: &mut ConversationHistory,
        query: &str,
        streaming: bool,
        on_fragment: Option<FragmentSink>,
    ) -> Result<TurnOutcome> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Empty query, nothing to do");
            return Ok(TurnOutcome::EmptyInput);
        }

        debug!(
            session = %history.session_id(),
            persona = %persona.id,
            phase = "awaiting_retrieval",
            "Turn started"
        );

        // Retrieval failure surfaces before any state change.
        let context = self.index.query(query).await?;

        let request = self.compose_request(persona, &context, history, query);
        history.push_user(query);

        debug!(
            phase = "awaiting_generation",
            context_chunks = context.chunks.len(),
            replay = (self.policy == HistoryPolicy::Replay),
            "Context retrieved"
        );

        let outcome = if streaming && self.backend.supports_streaming() {
            self.generate_streaming(request, history, on_fragment).await
        } else {
            self.generate_blocking(request, history).await
        };

        debug!(session = %history.session_id(), phase = "idle", "Turn finished");
        Ok(outcome)
    }

    /// Synchronous generation: one complete answer or an error placeholder.
    async fn generate_blocking(
        &self,
        request: ChatRequest,
        history: &mut ConversationHistory,
    ) -> TurnOutcome {
        match self.backend.chat(request).await {
            Ok(completion) => {
                history.push_assistant(completion.text.clone());
                TurnOutcome::Reply {
                    message: history.messages().last().expect("just appended").clone(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Generation failed, committing placeholder");
                let placeholder = format!("[no answer: {}]", e);
                history.push_assistant(placeholder);
                TurnOutcome::Failed {
                    message: history.messages().last().expect("just appended").clone(),
                    error: e,
                }
            }
        }
    }

    /// Streaming generation: fragments render incrementally and concatenate
    /// into the stored message. A mid-stream failure keeps whatever was
    /// produced so far.
    async fn generate_streaming(
        &self,
        request: ChatRequest,
        history: &mut ConversationHistory,
        on_fragment: Option<FragmentSink>,
    ) -> TurnOutcome {
        let accumulated = Arc::new(Mutex::new(String::new()));

        let sink = accumulated.clone();
        let callback = Box::new(move |fragment: StreamFragment| {
            if !fragment.text.is_empty() {
                sink.lock().push_str(&fragment.text);
                if let Some(ref forward) = on_fragment {
                    forward(&fragment.text);
                }
            }
            true
        });

        match self.backend.chat_stream(request, callback).await {
            Ok(_completion) => {
                // The stored message is the fragment concatenation, exactly.
                let text = accumulated.lock().clone();
                history.push_assistant(text);
                TurnOutcome::Reply {
                    message: history.messages().last().expect("just appended").clone(),
                }
            }
            Err(e) => {
                let partial = accumulated.lock().clone();
                warn!(error = %e, kept_chars = partial.len(), "Stream failed, keeping partial output");
                let stored = if partial.is_empty() {
                    format!("[no answer: {}]", e)
                } else {
                    partial
                };
                history.push_assistant(stored);
                TurnOutcome::Failed {
                    message: history.messages().last().expect("just appended").clone(),
                    error: e,
                }
            }
        }
    }
}

fn assistant_message(content: String) -> ConversationMessage {
    ConversationMessage {
        role: Role::Assistant,
        content,
        timestamp: chrono::Utc::now(),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
