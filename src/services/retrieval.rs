//! Conclusion memory retrieval.
//!
//! Embeds a query, fetches the most recent conclusions recorded under a
//! phase, and keeps the ones whose cosine similarity clears the threshold.
//! The candidate set is bounded by recency BEFORE scoring: what the store
//! saw last is what can be recalled, even when an older row would score
//! higher. Callers treat the result as advisory context.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::RetrievalConfig;
use crate::domain::ports::{EmbeddingProvider, MemoryStore};

/// One retrieved conclusion with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedConclusion {
    pub id: i64,
    pub content: String,
    pub similarity: f32,
}

/// Scores recent stored conclusions against a query embedding.
pub struct ConclusionRetriever {
    store: Arc<dyn MemoryStore>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl ConclusionRetriever {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedding,
            config,
        }
    }

    /// Retrieve conclusions recorded under `phase_name` relevant to `query`.
    ///
    /// Fetches the `top_k` newest rows, scores each against the query
    /// embedding, and keeps scores at or above the threshold. Rows whose
    /// embeddings cannot be scored (dimension mismatch, malformed vector)
    /// are skipped with a warning. Results keep the store's newest-first
    /// order.
    ///
    /// # Errors
    /// Returns `PhaseError::Retrieval` when the query cannot be embedded
    /// or the recency query fails.
    pub async fn retrieve(
        &self,
        phase_name: &str,
        query: &str,
    ) -> PhaseResult<Vec<RetrievedConclusion>> {
        let query_embedding = self
            .embedding
            .embed(query)
            .await
            .map_err(|e| PhaseError::Retrieval(format!("query embedding failed: {e}")))?;

        // A null provider yields an empty vector; nothing can match it.
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .store
            .query_recent(phase_name, self.config.top_k)
            .await
            .map_err(|e| PhaseError::Retrieval(format!("recency query failed: {e}")))?;

        let fetched = candidates.len();
        let mut kept = Vec::new();
        for row in candidates {
            match row.cosine_similarity(&query_embedding) {
                Some(score) if score >= self.config.similarity_threshold => {
                    kept.push(RetrievedConclusion {
                        id: row.id,
                        content: row.content,
                        similarity: score,
                    });
                }
                Some(_) => {}
                None => {
                    warn!(
                        conclusion_id = row.id,
                        phase = phase_name,
                        "Skipping conclusion with unusable embedding"
                    );
                }
            }
        }

        debug!(
            phase = phase_name,
            fetched,
            kept = kept.len(),
            threshold = self.config.similarity_threshold,
            "Memory retrieval complete"
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConclusionRecord, StoredConclusion};
    use async_trait::async_trait;

    struct StubStore {
        rows: Vec<StoredConclusion>,
    }

    #[async_trait]
    impl MemoryStore for StubStore {
        async fn find_or_create_phase(&self, _name: &str, _prompt: &str) -> PhaseResult<i64> {
            Ok(1)
        }

        async fn insert_conclusion(
            &self,
            _phase_id: i64,
            _record: &ConclusionRecord,
        ) -> PhaseResult<i64> {
            Ok(1)
        }

        async fn query_recent(
            &self,
            _phase_name: &str,
            limit: usize,
        ) -> PhaseResult<Vec<StoredConclusion>> {
            Ok(self.rows.iter().take(limit).cloned().collect())
        }
    }

    struct StubEmbedding {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedding {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn dimension(&self) -> usize {
            self.vector.len()
        }

        async fn embed(&self, _text: &str) -> PhaseResult<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    fn retriever_with(
        rows: Vec<StoredConclusion>,
        query_vector: Vec<f32>,
        config: RetrievalConfig,
    ) -> ConclusionRetriever {
        ConclusionRetriever::new(
            Arc::new(StubStore { rows }),
            Arc::new(StubEmbedding {
                vector: query_vector,
            }),
            config,
        )
    }

    fn row(id: i64, content: &str, embedding: Vec<f32>) -> StoredConclusion {
        StoredConclusion {
            id,
            content: content.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        // Unit vectors at exactly the threshold angle: cos = 0.75.
        let rows = vec![row(1, "kept", vec![0.75, (1.0f32 - 0.75 * 0.75).sqrt()])];
        let retriever = retriever_with(rows, vec![1.0, 0.0], RetrievalConfig::default());

        let result = retriever.retrieve("coding", "query").await.expect("retrieve");
        assert_eq!(result.len(), 1);
        assert!((result[0].similarity - 0.75).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_below_threshold_is_dropped() {
        let rows = vec![row(1, "orthogonal", vec![0.0, 1.0])];
        let retriever = retriever_with(rows, vec![1.0, 0.0], RetrievalConfig::default());

        let result = retriever.retrieve("coding", "query").await.expect("retrieve");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_skipped_not_fatal() {
        let rows = vec![
            row(1, "bad", vec![1.0, 0.0, 0.0]),
            row(2, "good", vec![1.0, 0.0]),
        ];
        let retriever = retriever_with(rows, vec![1.0, 0.0], RetrievalConfig::default());

        let result = retriever.retrieve("coding", "query").await.expect("retrieve");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 2);
    }

    #[tokio::test]
    async fn test_empty_query_embedding_disables_retrieval() {
        let rows = vec![row(1, "anything", vec![1.0, 0.0])];
        let retriever = retriever_with(rows, Vec::new(), RetrievalConfig::default());

        let result = retriever.retrieve("coding", "query").await.expect("retrieve");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_candidates_bounded_by_top_k() {
        let rows: Vec<StoredConclusion> = (0..10)
            .map(|i| row(i, "match", vec![1.0, 0.0]))
            .collect();
        let config = RetrievalConfig {
            top_k: 3,
            ..RetrievalConfig::default()
        };
        let retriever = retriever_with(rows, vec![1.0, 0.0], config);

        let result = retriever.retrieve("coding", "query").await.expect("retrieve");
        assert_eq!(result.len(), 3);
    }
}
