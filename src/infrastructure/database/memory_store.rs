use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

use crate::domain::errors::PhaseResult;
use crate::domain::models::{ConclusionRecord, StoredConclusion};
use crate::domain::ports::MemoryStore;

/// SQLite implementation of the conclusion memory store
///
/// Two tables back the store: `phases` (one row per phase name, created
/// lazily) and `conclusions` (append-only, insertion order preserved by
/// the rowid). Embeddings are stored as JSON arrays in a TEXT column.
pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

/// One row of the cross-phase conclusion listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConclusionSummary {
    pub phase_name: String,
    pub role_pair: String,
    pub content_kind: String,
    pub content: String,
    pub created_at: String,
}

impl SqliteMemoryStore {
    /// Create a new store over an existing connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the most recent conclusions across every phase, newest first.
    ///
    /// Reporting query for the CLI; retrieval during a run goes through
    /// [`MemoryStore::query_recent`] instead.
    pub async fn recent_across_phases(&self, limit: usize) -> PhaseResult<Vec<ConclusionSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r"
            SELECT p.name, c.role_pair, c.content_kind, c.content, c.created_at
            FROM conclusions c
            JOIN phases p ON p.id = c.phase_id
            ORDER BY c.id DESC
            LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(phase_name, role_pair, content_kind, content, created_at)| ConclusionSummary {
                    phase_name,
                    role_pair,
                    content_kind,
                    content,
                    created_at,
                },
            )
            .collect())
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn find_or_create_phase(&self, name: &str, prompt: &str) -> PhaseResult<i64> {
        let created_at = Utc::now().to_rfc3339();

        // ON CONFLICT DO NOTHING keeps this race-safe: concurrent callers
        // both land on the SELECT below and read the same row.
        sqlx::query(
            r"
            INSERT INTO phases (name, prompt, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            ",
        )
        .bind(name)
        .bind(prompt)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM phases WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    async fn insert_conclusion(
        &self,
        phase_id: i64,
        record: &ConclusionRecord,
    ) -> PhaseResult<i64> {
        let embedding_json = serde_json::to_string(&record.embedding)?;
        let created_at = record.created_at.to_rfc3339();

        let result = sqlx::query(
            r"
            INSERT INTO conclusions (phase_id, role_pair, content, content_kind, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(phase_id)
        .bind(&record.role_pair)
        .bind(&record.content)
        .bind(record.content_kind.as_str())
        .bind(&embedding_json)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn query_recent(
        &self,
        phase_name: &str,
        limit: usize,
    ) -> PhaseResult<Vec<StoredConclusion>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            r"
            SELECT c.id, c.content, c.embedding
            FROM conclusions c
            JOIN phases p ON p.id = c.phase_id
            WHERE p.name = ?
            ORDER BY c.id DESC
            LIMIT ?
            ",
        )
        .bind(phase_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let conclusions = rows
            .into_iter()
            .map(|(id, content, embedding_json)| {
                // A malformed embedding degrades to an empty vector; the
                // similarity filter then skips the row instead of failing
                // the whole retrieval.
                let embedding = serde_json::from_str(&embedding_json).unwrap_or_else(|e| {
                    warn!(conclusion_id = id, error = %e, "stored embedding is not valid JSON");
                    Vec::new()
                });

                StoredConclusion {
                    id,
                    content,
                    embedding,
                }
            })
            .collect();

        Ok(conclusions)
    }
}
