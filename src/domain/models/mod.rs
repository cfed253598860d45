pub mod completion;
pub mod conclusion;
pub mod config;
pub mod environment;
pub mod history;
pub mod message;
pub mod phase;

pub use completion::{ChatCompletion, CompletionChoice, TokenUsage};
pub use conclusion::{cosine_similarity, ConclusionRecord, ContentKind, StoredConclusion};
pub use config::{
    BackendConfig, ChainConfig, ChainStep, Config, CycleConfig, DatabaseConfig, EmbeddingConfig,
    LoggingConfig, PhaseStepConfig, RateLimitConfig, RetrievalConfig, RetryConfig,
};
pub use environment::ChainEnv;
pub use history::ConversationHistory;
pub use message::{extract_conclusion, ChatMessage, RoleKind, TERMINATION_MARKER};
pub use phase::{PhaseState, PhaseStateUpdate, PhaseStatus};
