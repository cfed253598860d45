//! Model-backend completion shapes, independent of any wire format.

use serde::{Deserialize, Serialize};

/// Token accounting reported by the backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One completion choice: the produced role-tagged content plus the
/// backend's stop reason for that choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub role: String,
    pub content: String,
    pub stop_reason: Option<String>,
}

/// A successful backend completion: identifier, one or more choices, and
/// usage. A response that cannot be shaped into this struct is a backend
/// error, never silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: TokenUsage,
}
