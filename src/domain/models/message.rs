//! Chat message model shared by agents, sessions, and the phase engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved marker an agent emits on the last line of a response to declare
/// it has reached a final answer.
pub const TERMINATION_MARKER: &str = "<INFO>";

/// The structural role a message plays in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    System,
    Assistant,
    User,
}

impl RoleKind {
    /// Wire-format name used in backend requests.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }

    /// Parse a `RoleKind` from its wire-format name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "assistant" => Some(Self::Assistant),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable message in a conversation.
///
/// `role_name` is the persona ("Chief Executive Officer"), `role_kind` the
/// structural slot the backend sees. Insertion order within a history is
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Persona name of the sender.
    pub role_name: String,

    /// Structural role for the backend.
    pub role_kind: RoleKind,

    /// Message body.
    pub content: String,

    /// Free-form annotations (phase name, turn index, retrieval ids).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ChatMessage {
    /// Create a message with an empty metadata map.
    pub fn new(
        role_name: impl Into<String>,
        role_kind: RoleKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            role_kind,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Convenience constructor for a system message.
    pub fn system(role_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(role_name, RoleKind::System, content)
    }

    /// Convenience constructor for an assistant message.
    pub fn assistant(role_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(role_name, RoleKind::Assistant, content)
    }

    /// Convenience constructor for a user message.
    pub fn user(role_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(role_name, RoleKind::User, content)
    }

    /// Attach a metadata entry (builder style).
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this message declares termination: its last line starts with
    /// the reserved marker. A trailing newline leaves an empty final line,
    /// which never matches.
    pub fn declares_termination(&self) -> bool {
        self.content
            .rsplit('\n')
            .next()
            .is_some_and(|line| line.starts_with(TERMINATION_MARKER))
    }
}

/// Extract the conclusion from marker-delimited content: everything after
/// the LAST marker occurrence wins, discarding earlier marker-prefixed text.
/// Content without a marker is returned whole. The result is trimmed.
pub fn extract_conclusion(content: &str) -> &str {
    content
        .rsplit(TERMINATION_MARKER)
        .next()
        .unwrap_or(content)
        .trim()
}
