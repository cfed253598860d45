//! Append-only conversation history with a windowed view.

use crate::domain::models::message::{ChatMessage, RoleKind};

/// Ordered message log for one agent.
///
/// Always begins with exactly one system message (the role's persona).
/// Mutation is append-only; windowing derives a truncated view and never
/// touches the stored sequence.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    /// Create a history seeded with the role's system message.
    pub fn new(system_message: ChatMessage) -> Self {
        debug_assert_eq!(system_message.role_kind, RoleKind::System);
        Self {
            messages: vec![system_message],
        }
    }

    /// The persona message at position zero.
    pub fn system_message(&self) -> &ChatMessage {
        &self.messages[0]
    }

    /// Append a message; insertion order is chronological order.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop everything except the system message and return the remaining
    /// messages.
    pub fn reset(&mut self) -> &[ChatMessage] {
        self.messages.truncate(1);
        &self.messages
    }

    /// All stored messages in order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// A history always holds at least its system message.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Build the message view sent to the backend: when a window is
    /// configured and the history has outgrown it, `[system] + last(window)`;
    /// otherwise the full history. Never mutates storage.
    pub fn view(&self, window_size: Option<usize>) -> Vec<ChatMessage> {
        if let Some(window) = window_size {
            if self.messages.len() > window {
                let tail_start = self.messages.len() - window;
                let mut view = Vec::with_capacity(window + 1);
                view.push(self.messages[0].clone());
                view.extend_from_slice(&self.messages[tail_start..]);
                return view;
            }
        }
        self.messages.clone()
    }

    /// Render the full history as a reflection transcript: one
    /// `"name: content"` line block per message, double newlines inside a
    /// message collapsed to single, blocks joined by blank lines.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role_name, m.content.replace("\n\n", "\n")))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
