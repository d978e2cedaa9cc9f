//! Query-side services: semantic search over the vector index and lexical
//! search over the FTS5 tables.
//!
//! Semantic results pass an asymmetric similarity gate: the best-ranked
//! candidate only has to clear [`SimilarityGate::primary`], every later
//! candidate must clear the stricter [`SimilarityGate::follow_up`]. The gate
//! trades recall on the first answer against precision on the padding.

pub mod sanitize;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::stores::{PageHit, SqliteStore};
use crate::types::RagError;

pub use sanitize::sanitize_term;

/// Two-tier similarity threshold for semantic queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityGate {
    /// Floor for the first accepted result.
    pub primary: f32,
    /// Floor for every result after the first.
    pub follow_up: f32,
}

impl Default for SimilarityGate {
    fn default() -> Self {
        Self {
            primary: 0.60,
            follow_up: 0.65,
        }
    }
}

/// Answers retrieval queries against the stores and the vector index.
pub struct RetrievalService {
    store: SqliteStore,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<RwLock<VectorIndex>>,
    gate: SimilarityGate,
    oversample: usize,
    min_views: i64,
}

impl RetrievalService {
    pub fn new(
        store: SqliteStore,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<RwLock<VectorIndex>>,
        gate: SimilarityGate,
        oversample: usize,
        min_views: i64,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            gate,
            oversample: oversample.max(1),
            min_views,
        }
    }

    /// Embeds `text` and returns up to `k` unique chunk texts in similarity
    /// order. A failed query embedding yields no results rather than an
    /// error.
    pub async fn semantic_query(&self, text: &str, k: usize) -> Result<Vec<String>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let reply = self.embedder.embed_one(text).await?;
        let status = reply.status;
        let Some(vectors) = reply.into_vectors() else {
            warn!(status, "query embedding failed");
            return Ok(Vec::new());
        };
        let Some(query) = vectors.into_iter().next() else {
            return Ok(Vec::new());
        };

        // Oversample so dedup and gating still leave k candidates to pick from.
        let hits = self
            .index
            .read()
            .search(&query, k.saturating_mul(self.oversample))?;

        let mut snippets: Vec<String> = Vec::new();
        for (score, chunk_id) in hits {
            let floor = if snippets.is_empty() {
                self.gate.primary
            } else {
                self.gate.follow_up
            };
            if score < floor {
                continue;
            }
            let Some(text) = self.store.chunk_text(chunk_id).await? else {
                continue;
            };
            if !snippets.contains(&text) {
                snippets.push(text);
            }
            if snippets.len() >= k {
                break;
            }
        }
        Ok(snippets)
    }

    /// Sanitized full-text search over chunk text, deduplicated, in FTS5
    /// relevance order. An empty sanitized term matches nothing.
    pub async fn lexical_query(&self, term: &str, k: usize) -> Result<Vec<String>, RagError> {
        let match_expr = sanitize_term(term);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self.store.search_chunks(&match_expr, k).await?;
        let mut texts: Vec<String> = Vec::new();
        for hit in hits {
            if !texts.contains(&hit.text) {
                texts.push(hit.text);
            }
        }
        texts.truncate(k);
        Ok(texts)
    }

    /// Sanitized full-text search over page names, filtered by the
    /// popularity floor, ordered by relevance then views.
    pub async fn search_documents(&self, term: &str, k: usize) -> Result<Vec<PageHit>, RagError> {
        let match_expr = sanitize_term(term);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }
        self.store.search_pages(&match_expr, self.min_views, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingReply;
    use crate::stores::NewChunk;
    use async_trait::async_trait;

    /// Always embeds to the same vector, with a configurable status.
    struct FixedEmbedding {
        vector: Vec<f32>,
        status: u16,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedding {
        async fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingReply, RagError> {
            if self.status != 200 {
                return Ok(EmbeddingReply {
                    status: self.status,
                    vectors: None,
                });
            }
            Ok(EmbeddingReply {
                status: 200,
                vectors: Some(vec![self.vector.clone(); inputs.len()]),
            })
        }
    }

    /// Unit vector whose inner product with `[1, 0, 0, 0]` is `similarity`.
    fn unit_with_similarity(similarity: f32) -> Vec<f32> {
        vec![
            similarity,
            (1.0 - similarity * similarity).sqrt(),
            0.0,
            0.0,
        ]
    }

    async fn service_with_chunks(
        chunks: Vec<(&str, f32)>,
        query_status: u16,
    ) -> RetrievalService {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.register_page("en.wikipedia", "Test").await.unwrap();
        let page = store
            .find_page("en.wikipedia", "Test")
            .await
            .unwrap()
            .unwrap();

        let rows: Vec<NewChunk> = chunks
            .iter()
            .map(|(text, similarity)| NewChunk {
                text: (*text).to_string(),
                status: 200,
                vector: Some(unit_with_similarity(*similarity)),
            })
            .collect();
        store.insert_chunks(page.id, rows).await.unwrap();

        let mut index = VectorIndex::new(4);
        let stored = store.embedded_chunks(None).await.unwrap();
        let (ids, vectors): (Vec<i64>, Vec<Vec<f32>>) = stored.into_iter().unzip();
        index.add(&ids, &vectors).unwrap();

        let embedder = Arc::new(FixedEmbedding {
            vector: vec![1.0, 0.0, 0.0, 0.0],
            status: query_status,
        });
        RetrievalService::new(
            store,
            embedder,
            Arc::new(RwLock::new(index)),
            SimilarityGate::default(),
            4,
            1_000,
        )
    }

    #[tokio::test]
    async fn first_result_clears_lower_bar_than_the_rest() {
        // 0.63 clears the primary floor but not the follow-up floor, so only
        // the best candidate survives.
        let service =
            service_with_chunks(vec![("top", 0.62), ("mid", 0.63), ("low", 0.58)], 200).await;
        let results = service.semantic_query("anything", 5).await.unwrap();
        assert_eq!(results, vec!["mid".to_string()]);
    }

    #[tokio::test]
    async fn strong_matches_all_pass() {
        let service = service_with_chunks(vec![("a", 0.9), ("b", 0.7)], 200).await;
        let results = service.semantic_query("anything", 5).await.unwrap();
        assert_eq!(results, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_texts_appear_once() {
        let service =
            service_with_chunks(vec![("dup", 0.9), ("dup", 0.88), ("other", 0.7)], 200).await;
        let results = service.semantic_query("anything", 5).await.unwrap();
        assert_eq!(results, vec!["dup".to_string(), "other".to_string()]);
    }

    #[tokio::test]
    async fn stops_after_k_unique_snippets() {
        let service =
            service_with_chunks(vec![("a", 0.9), ("b", 0.85), ("c", 0.8)], 200).await;
        let results = service.semantic_query("anything", 2).await.unwrap();
        assert_eq!(results, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn failed_query_embedding_returns_nothing() {
        let service = service_with_chunks(vec![("a", 0.9)], 500).await;
        let results = service.semantic_query("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn lexical_query_dedups_and_respects_sanitizer() {
        let service = service_with_chunks(vec![("wood finish test", 0.9)], 200).await;
        let results = service
            .lexical_query("Wood (Finish) AND test", 5)
            .await
            .unwrap();
        assert_eq!(results, vec!["wood finish test".to_string()]);

        // nothing survives sanitization: match nothing
        let results = service.lexical_query("AND OR NOT", 5).await.unwrap();
        assert!(results.is_empty());
    }
}
