//! Colloquy - Phase-Chained Dialogue Engine
//!
//! Colloquy runs bounded multi-turn dialogues between two role-playing
//! agents, chains those dialogues into phases, and carries each phase's
//! conclusion forward through a shared environment. Conclusions are
//! persisted with embeddings so later runs can retrieve them as memory.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Messages, conclusions, chain environment,
//!   configuration, and the port traits adapters implement
//! - **Service Layer** (`services`): Dialogue agents, role-play sessions,
//!   the phase engine, and the phase chain
//! - **Infrastructure Layer** (`infrastructure`): SQLite store,
//!   OpenAI-compatible clients, config loading, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use colloquy::infrastructure::config::ConfigLoader;
//! use colloquy::services::PhaseChain;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load(None)?;
//!     // wire adapters, build a PhaseContext, then drive a PhaseChain
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{PhaseError, PhaseResult};
pub use domain::models::{
    ChainConfig, ChainEnv, ChatCompletion, ChatMessage, ConclusionRecord, Config, ContentKind,
    PhaseState, RoleKind, StoredConclusion,
};
pub use domain::ports::{
    ControlDecision, ControlSurface, EmbeddingProvider, MemoryStore, ModelBackend,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{PhaseChain, PhaseContext, PhaseEngine, PhaseKind};
