use async_trait::async_trait;

use crate::domain::errors::PhaseResult;
use crate::domain::models::{ConclusionRecord, StoredConclusion};

/// Repository trait for the conclusion memory store.
///
/// Provides async methods over two tables: phases (one row per phase
/// name) and conclusions (one row per persisted dialogue outcome,
/// insertion order preserved by the rowid).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Find a phase row by name, creating it if absent.
    ///
    /// Must be race-safe: two concurrent calls with the same name both
    /// succeed and return the same id.
    ///
    /// # Arguments
    /// * `name` - Unique phase name
    /// * `prompt` - Phase prompt template recorded on first creation
    ///
    /// # Errors
    /// Returns `PhaseError::Persistence` if the database operation fails.
    async fn find_or_create_phase(&self, name: &str, prompt: &str) -> PhaseResult<i64>;

    /// Insert one conclusion under an existing phase.
    ///
    /// Returns the rowid of the inserted conclusion.
    ///
    /// # Arguments
    /// * `phase_id` - Id from `find_or_create_phase`
    /// * `record` - Conclusion content, kind, role pair, and optional embedding
    ///
    /// # Errors
    /// Returns `PhaseError::Persistence` if the database operation fails.
    async fn insert_conclusion(
        &self,
        phase_id: i64,
        record: &ConclusionRecord,
    ) -> PhaseResult<i64>;

    /// Fetch the most recent conclusions for a phase, newest first.
    ///
    /// Similarity filtering happens in the caller; this method only
    /// bounds the candidate set by recency.
    ///
    /// # Arguments
    /// * `phase_name` - Phase to query
    /// * `limit` - Maximum number of rows to return
    ///
    /// # Errors
    /// Returns `PhaseError::Persistence` if the database operation fails.
    async fn query_recent(
        &self,
        phase_name: &str,
        limit: usize,
    ) -> PhaseResult<Vec<StoredConclusion>>;
}
