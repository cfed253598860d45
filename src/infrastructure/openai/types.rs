//! Request and response types for the OpenAI-compatible chat and
//! embedding endpoints.

use serde::{Deserialize, Serialize};

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,

    /// Ordered conversation, system message first
    pub messages: Vec<WireMessage>,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token cap (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One message on the wire: structural role plus content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// "system", "user", or "assistant"
    pub role: String,

    /// Message body
    pub content: String,
}

/// Chat completion response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Unique completion ID
    pub id: String,

    /// Completion choices; the engine reads the first
    pub choices: Vec<WireChoice>,

    /// Token usage statistics (absent from some compatible servers)
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// One completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,

    /// Generated message
    pub message: WireMessage,

    /// Why generation stopped ("stop", "length", ...)
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

/// Embedding request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Embedding model identifier
    pub model: String,

    /// Text to embed
    pub input: String,
}

/// Embedding response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// One entry per input; single-input requests get exactly one
    pub data: Vec<EmbeddingItem>,
}

/// One embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingItem {
    /// Input index this vector belongs to
    #[serde(default)]
    pub index: u32,

    /// The embedding vector
    pub embedding: Vec<f32>,
}
