//! Vector index: embedding-based relevance ranking over document chunks.
//!
//! Built once at bootstrap: every chunk is embedded through the backend's
//! embeddings endpoint. Queries embed the query text and rank chunks by
//! cosine similarity; a linear scan is plenty for a corpus this size.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::backend::{GenerationBackend, SharedBackend};
use crate::config::RetrievalSettings;
use crate::error::{Error, Result};

use super::store::{DocumentChunk, DocumentStore};
use super::{RetrievalContext, RetrievalIndex, ScoredChunk};

/// Chunks are embedded in batches of this size during the build
const EMBED_BATCH: usize = 32;

struct IndexedChunk {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// Embedding index over the document store
pub struct VectorIndex {
    backend: SharedBackend,
    chunks: Vec<IndexedChunk>,
    top_k: usize,
    min_score: f32,
}

impl VectorIndex {
    /// One-time construction over the full document store. Any failure here
    /// aborts startup; the index is treated as infallible afterwards.
    pub async fn build(
        store: &DocumentStore,
        backend: SharedBackend,
        settings: &RetrievalSettings,
    ) -> Result<Self> {
        let chunks = store.chunks(settings.chunk_chars, settings.chunk_overlap);
        if chunks.is_empty() {
            return Err(Error::index_build(
                "document store produced no chunks".to_string(),
            ));
        }

        let mut indexed = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let output = backend
                .embed(&texts)
                .await
                .map_err(|e| Error::index_build(e.to_string()))?;

            if output.embeddings.len() != batch.len() {
                return Err(Error::index_build(format!(
                    "embeddings count mismatch: sent {}, received {}",
                    batch.len(),
                    output.embeddings.len()
                )));
            }

            for (chunk, embedding) in batch.iter().cloned().zip(output.embeddings) {
                indexed.push(IndexedChunk { chunk, embedding });
            }
        }

        info!(
            chunks = indexed.len(),
            top_k = settings.top_k,
            "Retrieval index built"
        );

        Ok(Self {
            backend,
            chunks: indexed,
            top_k: settings.top_k,
            min_score: settings.min_score,
        })
    }
}

#[async_trait]
impl RetrievalIndex for VectorIndex {
    async fn query(&self, text: &str) -> Result<RetrievalContext> {
        let output = self.backend.embed(&[text.to_string()]).await?;
        let query_embedding = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::retrieval("empty embeddings response".to_string()))?;

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|ic| ScoredChunk {
                text: ic.chunk.text.clone(),
                source: ic.chunk.source.clone(),
                score: cosine_similarity(&query_embedding, &ic.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);
        if self.min_score > 0.0 {
            scored.retain(|c| c.score >= self.min_score);
        }

        debug!(
            returned = scored.len(),
            best = scored.first().map(|c| c.score).unwrap_or(0.0),
            "Retrieval query complete"
        );

        Ok(RetrievalContext { chunks: scored })
    }

    fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Cosine similarity between two vectors; 0.0 for degenerate input.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockConfig};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_with(docs: &[(&str, &str)]) -> (TempDir, DocumentStore) {
        let dir = TempDir::new().unwrap();
        for (name, content) in docs {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = DocumentStore::load(dir.path()).unwrap();
        (dir, store)
    }

    fn settings() -> RetrievalSettings {
        RetrievalSettings {
            chunk_chars: 200,
            chunk_overlap: 20,
            top_k: 2,
            min_score: 0.0,
        }
    }

    #[tokio::test]
    async fn test_build_embeds_every_chunk() {
        let (_dir, store) = store_with(&[
            ("a.txt", "alpha document"),
            ("b.txt", "beta document"),
            ("c.txt", "gamma document"),
        ]);
        let backend = Arc::new(MockBackend::new());

        let index = VectorIndex::build(&store, backend.clone(), &settings())
            .await
            .unwrap();

        assert_eq!(index.chunk_count(), 3);
        assert!(backend.call_count("embed") >= 1);
    }

    #[tokio::test]
    async fn test_exact_text_ranks_first() {
        let (_dir, store) = store_with(&[
            ("a.txt", "Utrecht waste policy 2025"),
            ("b.txt", "completely unrelated material"),
        ]);
        let backend = Arc::new(MockBackend::new());
        let index = VectorIndex::build(&store, backend, &settings()).await.unwrap();

        // The mock embedder is deterministic per text, so the identical
        // query embeds to the identical vector and scores 1.0.
        let context = index.query("Utrecht waste policy 2025").await.unwrap();
        assert!(!context.is_empty());
        assert_eq!(context.chunks[0].text, "Utrecht waste policy 2025");
        assert!((context.chunks[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_top_k_limits_results() {
        let (_dir, store) = store_with(&[
            ("a.txt", "one"),
            ("b.txt", "two"),
            ("c.txt", "three"),
            ("d.txt", "four"),
        ]);
        let backend = Arc::new(MockBackend::new());
        let index = VectorIndex::build(&store, backend, &settings()).await.unwrap();

        let context = index.query("anything").await.unwrap();
        assert!(context.chunks.len() <= 2);
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let (_dir, store) = store_with(&[("a.txt", "alpha"), ("b.txt", "beta")]);
        let backend = Arc::new(MockBackend::new());
        let mut s = settings();
        s.min_score = 0.999;
        let index = VectorIndex::build(&store, backend, &s).await.unwrap();

        // Only an exact match clears a 0.999 cut
        let context = index.query("alpha").await.unwrap();
        assert_eq!(context.chunks.len(), 1);
        assert_eq!(context.chunks[0].text, "alpha");
    }

    #[tokio::test]
    async fn test_build_failure_is_index_build_error() {
        let (_dir, store) = store_with(&[("a.txt", "doc")]);
        let backend = Arc::new(MockBackend::with_config(MockConfig {
            fail_embeddings: true,
            ..Default::default()
        }));

        let err = VectorIndex::build(&store, backend, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IndexBuild { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_query_failure_is_retrieval_error() {
        let (_dir, store) = store_with(&[("a.txt", "doc")]);
        let good = Arc::new(MockBackend::new());
        let index = VectorIndex::build(&store, good, &settings()).await.unwrap();

        // Swap in a failing backend for the query path
        let failing = Arc::new(MockBackend::with_config(MockConfig {
            fail_embeddings: true,
            ..Default::default()
        }));
        let index = VectorIndex {
            backend: failing,
            chunks: index.chunks,
            top_k: index.top_k,
            min_score: index.min_score,
        };

        let err = index.query("anything").await.unwrap_err();
        assert!(matches!(err, Error::Retrieval { .. }));
        assert!(err.is_resubmittable());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
