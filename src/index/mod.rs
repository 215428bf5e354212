//! Retrieval index module
//!
//! The index is built once over the document store at bootstrap and is
//! read-only afterwards, so a single `Arc` handle can be shared freely.
//! The engine only depends on the `RetrievalIndex` trait; the vector
//! implementation is one provider of it.

mod store;
mod vector;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use store::{chunk_text, Document, DocumentChunk, DocumentStore};
pub use vector::VectorIndex;

// ─────────────────────────────────────────────────────────────────
// Retrieval Context
// ─────────────────────────────────────────────────────────────────

/// A relevance-ranked chunk returned by a query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The chunk text
    pub text: String,

    /// Source document (relative path)
    pub source: String,

    /// Cosine similarity to the query
    pub score: f32,
}

/// The ranked context produced for one query. Ephemeral: consumed
/// immediately to build a generation request, never persisted.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalContext {
    /// Render the context as the text block injected into the prompt.
    pub fn render(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────
// RetrievalIndex Trait
// ─────────────────────────────────────────────────────────────────

/// Boundary contract of the retrieval capability as consumed by the engine.
///
/// A query runs to completion or raises; there is no cancellation. The
/// index never mutates the document store.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Return the relevance-ranked context for a query.
    async fn query(&self, text: &str) -> Result<RetrievalContext>;

    /// Number of chunks held by the index.
    fn chunk_count(&self) -> usize;
}

/// Type alias for a shared index handle
pub type SharedIndex = Arc<dyn RetrievalIndex>;

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
