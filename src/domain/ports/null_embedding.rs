//! Null embedding provider implementation.
//!
//! Used when memory retrieval is disabled but the type system requires
//! an `EmbeddingProvider` implementation. Empty vectors never score
//! against stored embeddings, so retrieval degrades to a no-op.

use async_trait::async_trait;

use super::embedding::EmbeddingProvider;
use crate::domain::errors::PhaseResult;

/// A no-op embedding provider that returns empty vectors.
#[derive(Debug, Clone, Default)]
pub struct NullEmbeddingProvider;

impl NullEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> PhaseResult<Vec<f32>> {
        Ok(Vec::new())
    }
}
