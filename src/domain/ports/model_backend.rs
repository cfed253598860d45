//! Model backend port for chat completion.
//!
//! Defines the trait for the language-model collaborator that turns a
//! message view into assistant output.

use async_trait::async_trait;

use crate::domain::errors::PhaseResult;
use crate::domain::models::{ChatCompletion, ChatMessage};

/// Port trait for the chat-completion backend.
///
/// The engine depends on this trait, not on a concrete HTTP client.
/// Adapters own transport concerns such as retries and rate limiting;
/// the engine only sees a completed response or a `PhaseError::Backend`.
///
/// Implementations must be `Send + Sync`: a single backend instance is
/// shared by both agents of a dialogue and called concurrently by
/// independent phase executions.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Model identifier used for logging and run reports.
    fn model(&self) -> &str;

    /// Request a completion for the given message view.
    ///
    /// # Arguments
    /// * `messages` - Ordered view, system message first
    ///
    /// # Errors
    /// Returns `PhaseError::Backend` for transport failures and for
    /// responses that cannot be interpreted (no choices, missing content).
    /// A malformed response is never silently repaired.
    async fn complete(&self, messages: &[ChatMessage]) -> PhaseResult<ChatCompletion>;
}
