//! Two-agent role-play session.
//!
//! Pairs a driving (assistant) agent with an instructing (user) agent and
//! runs them in strict alternation. Each agent sees the peer's words as
//! user-role input to its own backend; each agent's own output is recorded
//! back into its stored history by the session.

use std::collections::HashMap;

use crate::domain::errors::PhaseResult;
use crate::domain::models::{ChatMessage, RoleKind};
use crate::services::agent::{DialogueAgent, StepOutcome};

/// Replace `{key}` occurrences for every known placeholder. Unknown
/// placeholders are left as-is so a missing environment value is visible
/// in the transcript instead of silently vanishing.
pub fn render_placeholders(template: &str, placeholders: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in placeholders {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

/// A bounded dialogue between two agents.
pub struct DialogueSession {
    assistant: DialogueAgent,
    user: DialogueAgent,
}

impl DialogueSession {
    pub fn new(assistant: DialogueAgent, user: DialogueAgent) -> Self {
        Self { assistant, user }
    }

    pub fn assistant(&self) -> &DialogueAgent {
        &self.assistant
    }

    pub fn user(&self) -> &DialogueAgent {
        &self.user
    }

    /// Reset both agents and seed the opening instruction.
    ///
    /// The rendered prompt becomes a user-kind message attributed to the
    /// instructing role, returned to the caller as the first loop input.
    /// The instructing agent stores an assistant-kind copy first: from its
    /// own point of view it spoke the opening.
    pub fn init_chat(
        &mut self,
        phase_prompt: &str,
        placeholders: &HashMap<String, String>,
    ) -> ChatMessage {
        self.assistant.reset();
        self.user.reset();

        let content = render_placeholders(phase_prompt, placeholders);
        let seed = ChatMessage::user(self.user.role_name(), content);

        let mut pseudo = seed.clone();
        pseudo.role_kind = RoleKind::Assistant;
        self.user.record(pseudo);

        seed
    }

    /// One dialogue turn: step the assistant on `input`, then step the user
    /// on the assistant's reply unless `assistant_only` is set.
    ///
    /// A skipped or terminated assistant short-circuits the turn; the user
    /// outcome is then inert. Outputs that exist are recorded into their
    /// author's stored history before the peer sees them.
    ///
    /// # Errors
    /// Propagates `PhaseError::Backend` from either agent.
    pub async fn step(
        &mut self,
        input: &ChatMessage,
        assistant_only: bool,
    ) -> PhaseResult<(StepOutcome, StepOutcome)> {
        let assistant_input = as_peer_input(input);
        let assistant_outcome = self.assistant.step(&assistant_input).await?;

        let Some(assistant_msg) = assistant_outcome.messages.first() else {
            return Ok((assistant_outcome, StepOutcome::empty()));
        };
        let assistant_msg = assistant_msg.clone();
        self.assistant.record(assistant_msg.clone());

        if assistant_only {
            return Ok((assistant_outcome, StepOutcome::empty()));
        }

        let user_input = as_peer_input(&assistant_msg);
        let user_outcome = self.user.step(&user_input).await?;
        if let Some(user_msg) = user_outcome.messages.first() {
            self.user.record(user_msg.clone());
        }

        Ok((assistant_outcome, user_outcome))
    }
}

/// A peer's message enters an agent's backend view as user-role input,
/// keeping the original persona name.
fn as_peer_input(message: &ChatMessage) -> ChatMessage {
    let mut input = message.clone();
    input.role_kind = RoleKind::User;
    input
}
