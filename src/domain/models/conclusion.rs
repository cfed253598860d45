//! Persisted phase conclusions and similarity scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a conclusion's content carries; selects the embedding treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Code,
}

impl ContentKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "code" => Some(Self::Code),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cosine similarity between two vectors.
///
/// Returns `None` when the dimensions differ or either vector has zero
/// norm; callers skip such candidates rather than failing.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

/// A phase conclusion ready to be written to the store, embedding included.
///
/// Records are append-only: created exactly once per concluded phase cycle,
/// never mutated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConclusionRecord {
    pub phase_name: String,

    /// `"<user role><-><assistant role>"` pairing that produced the
    /// conclusion.
    pub role_pair: String,

    pub content: String,

    pub content_kind: ContentKind,

    /// Embedding of `content`; length is constant per embedding model.
    pub embedding: Vec<f32>,

    pub created_at: DateTime<Utc>,
}

impl ConclusionRecord {
    /// Create a record with an empty embedding; attach one with
    /// [`Self::with_embedding`].
    pub fn new(
        phase_name: impl Into<String>,
        role_pair: impl Into<String>,
        content: impl Into<String>,
        content_kind: ContentKind,
    ) -> Self {
        Self {
            phase_name: phase_name.into(),
            role_pair: role_pair.into(),
            content: content.into(),
            content_kind,
            embedding: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach the content embedding (builder style).
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// A conclusion as returned by a recency query: identifier, content, and
/// stored embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredConclusion {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl StoredConclusion {
    /// Similarity of this record's embedding against a query vector;
    /// `None` for malformed or dimension-mismatched embeddings.
    pub fn cosine_similarity(&self, query: &[f32]) -> Option<f32> {
        cosine_similarity(&self.embedding, query)
    }
}
