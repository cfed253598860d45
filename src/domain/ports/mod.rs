//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters
//! and drivers must implement:
//! - `ModelBackend`: Chat-completion calls
//! - `EmbeddingProvider`: Text-to-vector generation for memory retrieval
//! - `MemoryStore`: Durable phase and conclusion storage
//! - `ControlSurface`: Driver-side conclusion review and human escalation
//!
//! These traits define the contracts that allow the engine to be independent
//! of specific infrastructure implementations.

pub mod control;
pub mod embedding;
pub mod memory_store;
pub mod model_backend;
pub mod null_embedding;

pub use control::{AutoControl, ControlDecision, ControlSurface};
pub use embedding::EmbeddingProvider;
pub use memory_store::MemoryStore;
pub use model_backend::ModelBackend;
pub use null_embedding::NullEmbeddingProvider;
