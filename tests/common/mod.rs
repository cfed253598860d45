//! Common test utilities for integration tests
//!
//! Provides the scripted backend, fixed-vector embedding provider, and
//! store fixtures shared across integration test files.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use colloquy::domain::errors::PhaseResult;
use colloquy::domain::models::{
    ChainConfig, ChainStep, ChatCompletion, ChatMessage, CompletionChoice, PhaseStepConfig,
    RetrievalConfig, TokenUsage,
};
use colloquy::domain::ports::{EmbeddingProvider, MemoryStore, ModelBackend};
use colloquy::infrastructure::database::{DatabaseConnection, SqliteMemoryStore};
use colloquy::services::{AgentSettings, PhaseContext};

/// Backend that replays a fixed script of completions in call order.
///
/// Calls past the end of the script return "out of script", which keeps
/// a miscounted test visibly wrong instead of hanging.
pub struct ScriptedBackend {
    responses: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: responses.iter().map(|r| (*r).to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> PhaseResult<ChatCompletion> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self
            .responses
            .get(index)
            .cloned()
            .unwrap_or_else(|| "out of script".to_string());
        Ok(ChatCompletion {
            id: format!("scripted-{index}"),
            choices: vec![CompletionChoice {
                role: "assistant".to_string(),
                content,
                stop_reason: Some("stop".to_string()),
            }],
            usage: TokenUsage::default(),
        })
    }
}

/// Embedding provider that returns the same vector for every input.
pub struct FixedEmbedding {
    vector: Vec<f32>,
}

impl FixedEmbedding {
    pub fn new(vector: Vec<f32>) -> Arc<Self> {
        Arc::new(Self { vector })
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedding {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    async fn embed(&self, _text: &str) -> PhaseResult<Vec<f32>> {
        Ok(self.vector.clone())
    }
}

/// Open a migrated in-memory store. The connection must outlive the
/// store, so both are returned.
pub async fn sqlite_store() -> (DatabaseConnection, Arc<SqliteMemoryStore>) {
    let db = DatabaseConnection::in_memory()
        .await
        .expect("failed to open in-memory database");
    db.migrate().await.expect("failed to run migrations");
    let store = Arc::new(SqliteMemoryStore::new(db.pool().clone()));
    (db, store)
}

/// Context over the default chain prompts with the given services.
pub fn context_with(
    backend: Arc<dyn ModelBackend>,
    embedding: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn MemoryStore>,
) -> Arc<PhaseContext> {
    let config = ChainConfig::default();
    Arc::new(PhaseContext::new(
        backend,
        embedding,
        store,
        RetrievalConfig::default(),
        AgentSettings::default(),
        config.background_prompt,
        config.role_prompts,
    ))
}

pub fn step(kind: &str, assistant: &str, user: &str) -> PhaseStepConfig {
    PhaseStepConfig {
        kind: kind.to_string(),
        assistant_role: assistant.to_string(),
        user_role: user.to_string(),
        turn_limit: None,
        need_reflect: false,
    }
}

pub fn single(kind: &str, assistant: &str, user: &str) -> ChainStep {
    ChainStep::Single(step(kind, assistant, user))
}

pub fn chain_with(phases: Vec<ChainStep>) -> ChainConfig {
    ChainConfig {
        phases,
        ..ChainConfig::default()
    }
}
