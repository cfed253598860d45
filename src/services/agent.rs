//! Dialogue agent: one persona with an append-only history, a token
//! budget gate, and optional conclusion-memory injection.
//!
//! An agent never calls the backend once its budget is exhausted, and a
//! terminated agent stays terminated until reset. Budget exhaustion is an
//! outcome, not an error; only transport and malformed-response failures
//! surface as `PhaseError::Backend`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::PhaseResult;
use crate::domain::models::{ChatMessage, ConversationHistory, RoleKind, TokenUsage};
use crate::domain::ports::ModelBackend;
use crate::services::retrieval::ConclusionRetriever;

/// Estimation granularity: roughly four characters per token.
const CHARS_PER_TOKEN: usize = 4;

/// Fixed framing cost charged per message in a view.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimate tokens for a single text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate tokens for a whole message view, role framing included.
pub fn estimate_view_tokens(messages: &[ChatMessage]) -> usize {
    messages
        .iter()
        .map(|m| estimate_tokens(&m.content) + MESSAGE_OVERHEAD_TOKENS)
        .sum()
}

/// Tunables for one dialogue agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Window over stored history when building the backend view.
    pub message_window: Option<usize>,

    /// Strict upper bound on the estimated view size. A view estimated at
    /// or above this count is never sent.
    pub token_limit: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            message_window: None,
            token_limit: 16_384,
        }
    }
}

/// Diagnostic payload accompanying each step.
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    /// Backend response id; absent when no call was made.
    pub response_id: Option<String>,

    /// Token usage reported by the backend.
    pub usage: Option<TokenUsage>,

    /// Stop reasons per choice, or the budget/termination reason.
    pub termination_reasons: Vec<String>,

    /// Estimated size of the view that was (or would have been) sent.
    pub estimated_tokens: usize,
}

/// Result of a single agent step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Wrapped backend choices, empty when the step was skipped.
    pub messages: Vec<ChatMessage>,

    /// Whether the agent is (now) terminated.
    pub terminated: bool,

    /// Whether this agent has declared a marker conclusion.
    pub declared_conclusion: bool,

    pub info: StepInfo,
}

impl StepOutcome {
    /// Outcome for a step that never reached the backend.
    fn skipped(terminated: bool, declared: bool, reason: String, estimated: usize) -> Self {
        Self {
            messages: Vec::new(),
            terminated,
            declared_conclusion: declared,
            info: StepInfo {
                response_id: None,
                usage: None,
                termination_reasons: vec![reason],
                estimated_tokens: estimated,
            },
        }
    }

    /// An inert outcome for a peer that was not stepped this turn.
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            terminated: false,
            declared_conclusion: false,
            info: StepInfo::default(),
        }
    }
}

/// One side of a two-agent dialogue.
pub struct DialogueAgent {
    role_name: String,
    role_kind: RoleKind,
    phase_name: String,
    history: ConversationHistory,
    backend: Arc<dyn ModelBackend>,
    retriever: Option<Arc<ConclusionRetriever>>,
    settings: AgentSettings,
    terminated: bool,
    declared_conclusion: bool,
}

impl DialogueAgent {
    pub fn new(
        role_name: impl Into<String>,
        role_kind: RoleKind,
        system_prompt: impl Into<String>,
        phase_name: impl Into<String>,
        backend: Arc<dyn ModelBackend>,
        settings: AgentSettings,
    ) -> Self {
        let role_name = role_name.into();
        let history = ConversationHistory::new(ChatMessage::system(&role_name, system_prompt));
        Self {
            role_name,
            role_kind,
            phase_name: phase_name.into(),
            history,
            backend,
            retriever: None,
            settings,
            terminated: false,
            declared_conclusion: false,
        }
    }

    /// Enable conclusion-memory injection for this agent.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<ConclusionRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub fn declared_conclusion(&self) -> bool {
        self.declared_conclusion
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Record a message into stored history without stepping. Used by the
    /// session to store an agent's own output and to seed openings.
    pub fn record(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    /// Clear termination state and stored history back to the persona
    /// message. Returns the post-reset history.
    pub fn reset(&mut self) -> &[ChatMessage] {
        self.terminated = false;
        self.declared_conclusion = false;
        self.history.reset()
    }

    /// One agent turn: inject relevant memory, append the input, build the
    /// windowed view, and call the backend if the budget allows.
    ///
    /// Termination is absorbing: a terminated agent returns immediately
    /// without touching its history or the backend.
    ///
    /// # Errors
    /// Returns `PhaseError::Backend` when the backend call fails or its
    /// response cannot be interpreted.
    pub async fn step(&mut self, input: &ChatMessage) -> PhaseResult<StepOutcome> {
        if self.terminated {
            return Ok(StepOutcome::skipped(
                true,
                self.declared_conclusion,
                "already_terminated".to_string(),
                0,
            ));
        }

        self.inject_memory(&input.content).await;
        self.history.push(input.clone());

        let view = self.history.view(self.settings.message_window);
        let estimated = estimate_view_tokens(&view);
        if estimated >= self.settings.token_limit {
            self.terminated = true;
            warn!(
                role = %self.role_name,
                phase = %self.phase_name,
                estimated,
                limit = self.settings.token_limit,
                "Token budget exhausted, agent terminated"
            );
            return Ok(StepOutcome::skipped(
                true,
                self.declared_conclusion,
                format!(
                    "max_tokens_exceeded: estimated {estimated} >= limit {}",
                    self.settings.token_limit
                ),
                estimated,
            ));
        }

        let completion = self.backend.complete(&view).await?;

        let messages: Vec<ChatMessage> = completion
            .choices
            .iter()
            .map(|choice| ChatMessage::new(&self.role_name, self.role_kind, &choice.content))
            .collect();

        // The conclusion marker is only honored on the first choice; once
        // seen, the flag sticks until reset.
        if messages.first().is_some_and(ChatMessage::declares_termination) {
            self.declared_conclusion = true;
        }

        let termination_reasons = completion
            .choices
            .iter()
            .filter_map(|c| c.stop_reason.clone())
            .collect();

        Ok(StepOutcome {
            messages,
            terminated: false,
            declared_conclusion: self.declared_conclusion,
            info: StepInfo {
                response_id: Some(completion.id),
                usage: Some(completion.usage),
                termination_reasons,
                estimated_tokens: estimated,
            },
        })
    }

    /// Pull past conclusions relevant to the incoming content and append
    /// them to stored history as system notes, newest first. Retrieval
    /// failure degrades to no injection; memory is advisory.
    async fn inject_memory(&mut self, query: &str) {
        let Some(retriever) = self.retriever.clone() else {
            return;
        };
        match retriever.retrieve(&self.phase_name, query).await {
            Ok(records) => {
                for record in records {
                    debug!(
                        role = %self.role_name,
                        conclusion_id = record.id,
                        similarity = record.similarity,
                        "Injecting retrieved conclusion"
                    );
                    let note = format!(
                        "Conclusion reached in an earlier {} dialogue:\n{}",
                        self.phase_name, record.content
                    );
                    self.history.push(
                        ChatMessage::system(&self.role_name, note)
                            .with_metadata("retrieved_conclusion_id", record.id.to_string()),
                    );
                }
            }
            Err(e) => {
                warn!(
                    role = %self.role_name,
                    error = %e,
                    "Memory retrieval failed, continuing without it"
                );
            }
        }
    }
}
