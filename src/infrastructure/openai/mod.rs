//! OpenAI-compatible API infrastructure
//!
//! HTTP adapters for the chat-completion and embedding ports:
//! - `OpenAiBackend`: chat completions with retry and rate limiting
//! - `OpenAiEmbeddingProvider`: content embeddings for memory retrieval
//! - Shared error classification, retry policy, and token bucket

pub mod client;
pub mod embeddings;
pub mod errors;
pub mod rate_limiter;
pub mod retry;
pub mod types;

pub use client::OpenAiBackend;
pub use embeddings::OpenAiEmbeddingProvider;
pub use errors::OpenAiApiError;
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
