//! Phase engine: drives one bounded two-agent dialogue from seed prompt
//! to settled conclusion.
//!
//! `execute` is the whole pipeline for a phase: collect placeholder
//! values from the chain environment, run the dialogue (or skip it for
//! trivial inputs, or route through a human reviewer first), reflect
//! when nobody declared a conclusion, hand the verdict to the control
//! surface, fold the accepted conclusion back into the environment, and
//! persist it to the memory store.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::{
    extract_conclusion, ChainEnv, ChatMessage, ConclusionRecord, PhaseState, PhaseStateUpdate,
    PhaseStatus, RetrievalConfig, RoleKind, TERMINATION_MARKER,
};
use crate::domain::ports::{
    AutoControl, ControlDecision, ControlSurface, EmbeddingProvider, MemoryStore, ModelBackend,
};
use crate::services::active_phase::ActivePhaseRegistry;
use crate::services::agent::{AgentSettings, DialogueAgent};
use crate::services::phase_kinds::PhaseKind;
use crate::services::retrieval::ConclusionRetriever;
use crate::services::role_play::{render_placeholders, DialogueSession};

/// Hard ceiling on the per-phase turn limit.
pub const MAX_TURN_LIMIT: usize = 100;

/// Fixed reviewer pair for every reflection dialogue.
const REFLECTION_ASSISTANT_ROLE: &str = "Chief Executive Officer";
const REFLECTION_USER_ROLE: &str = "Counselor";

/// Label reflections run under. Reflections are never persisted, so
/// memory retrieval against this label always comes back empty.
const REFLECTION_PHASE_NAME: &str = "Reflection";

const REFLECTION_PROMPT: &str =
    "Here is a conversation between two roles:\n\n{conversations}\n\n{question}";

// ===== Shared phase context =====

/// Services and settings shared by every phase in a chain run.
pub struct PhaseContext {
    pub backend: Arc<dyn ModelBackend>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn MemoryStore>,
    pub retriever: Arc<ConclusionRetriever>,
    pub registry: Arc<ActivePhaseRegistry>,
    pub control: Arc<dyn ControlSurface>,
    pub settings: AgentSettings,
    pub background_prompt: String,
    pub role_prompts: HashMap<String, String>,
}

impl PhaseContext {
    /// Assemble a context over the given services. The control surface
    /// defaults to [`AutoControl`] and the registry to a fresh slot;
    /// override either with the builders below.
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        embedding: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn MemoryStore>,
        retrieval: RetrievalConfig,
        settings: AgentSettings,
        background_prompt: impl Into<String>,
        role_prompts: HashMap<String, String>,
    ) -> Self {
        let retriever = Arc::new(ConclusionRetriever::new(
            store.clone(),
            embedding.clone(),
            retrieval,
        ));
        Self {
            backend,
            embedding,
            store,
            retriever,
            registry: Arc::new(ActivePhaseRegistry::new()),
            control: Arc::new(AutoControl),
            settings,
            background_prompt: background_prompt.into(),
            role_prompts,
        }
    }

    #[must_use]
    pub fn with_control(mut self, control: Arc<dyn ControlSurface>) -> Self {
        self.control = control;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ActivePhaseRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

// ===== Dialogue plumbing =====

/// Everything one dialogue run needs besides the engine itself.
struct DialogueRequest<'a> {
    assistant_role: &'a str,
    user_role: &'a str,
    prompt_template: &'a str,
    phase_label: &'a str,
    placeholders: &'a HashMap<String, String>,
    /// Replaces the rendered seed message, used when restarting.
    seed_override: Option<String>,
    turn_limit: usize,
    /// Whether turns are mirrored into the engine's phase state.
    track_state: bool,
}

/// Raw outcome of one dialogue run, before conclusion extraction.
struct DialogueOutcome {
    /// Content of the message that declared the termination marker.
    declared: Option<String>,
    /// Most recent assistant content; empty if the assistant never
    /// produced a message.
    last_assistant: String,
    /// Transcript of the longer of the two agent histories.
    transcript: String,
}

/// Recruitment verdicts must carry an explicit yes or no.
fn contains_decision_token(content: &str) -> bool {
    let lowered = content.to_lowercase();
    lowered.contains("yes") || lowered.contains("no")
}

// ===== Phase engine =====

/// One phase of the chain: a prompt, a role pair, and the lifecycle
/// state of its dialogue.
pub struct PhaseEngine {
    kind: PhaseKind,
    phase_prompt: String,
    assistant_role: String,
    user_role: String,
    context: Arc<PhaseContext>,
    status: PhaseStatus,
    state: PhaseState,
}

impl PhaseEngine {
    pub fn new(
        context: Arc<PhaseContext>,
        kind: PhaseKind,
        phase_prompt: impl Into<String>,
        assistant_role: impl Into<String>,
        user_role: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            phase_prompt: phase_prompt.into(),
            assistant_role: assistant_role.into(),
            user_role: user_role.into(),
            context,
            status: PhaseStatus::Init,
            state: PhaseState::default(),
        }
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn phase_name(&self) -> &str {
        self.kind.as_str()
    }

    pub fn status(&self) -> PhaseStatus {
        self.status
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    /// Apply a partial state update from an external controller.
    pub fn update_state(&mut self, update: PhaseStateUpdate) {
        self.state.apply(update);
    }

    /// Zero the phase state without touching the lifecycle status.
    pub fn reset_state(&mut self) {
        self.state.reset();
    }

    /// Queue a restart: the next `chatting` call discards the settled
    /// conclusion and opens with `prompt` instead of the phase seed.
    pub fn request_restart(&mut self, prompt: impl Into<String>) -> PhaseResult<()> {
        self.status.transition(PhaseStatus::RestartRequested)?;
        self.state.is_completed = false;
        self.state.needs_restart = true;
        self.state.restart_prompt = Some(prompt.into());
        self.state.document = None;
        Ok(())
    }

    /// Accept the settled conclusion as final.
    pub fn accept_conclusion(&mut self) {
        self.state.is_completed = true;
        self.state.needs_restart = false;
        self.state.restart_prompt = None;
    }

    // ===== Execution pipeline =====

    /// Run the phase end to end and return the mutated environment.
    ///
    /// # Errors
    ///
    /// Propagates dialogue preconditions, backend failures, and
    /// conclusion post-processing errors. Persistence failures are
    /// logged and swallowed.
    pub async fn execute(
        &mut self,
        mut env: ChainEnv,
        turn_limit: usize,
        need_reflect: bool,
    ) -> PhaseResult<ChainEnv> {
        info!(
            phase = self.kind.as_str(),
            assistant = %self.assistant_role,
            user = %self.user_role,
            turn_limit,
            need_reflect,
            "Executing phase"
        );
        self.publish().await;

        let mut placeholders = self.kind.update_phase_env(&env);

        // A known-trivial input short-circuits the dialogue and the
        // memory write.
        if let Some(shortcut) = self.kind.shortcut_conclusion(&env) {
            info!(phase = self.kind.as_str(), "Input needs no discussion, skipping dialogue");
            self.state.task_prompt = env.task_prompt().to_string();
            self.state.current_turn = 0;
            self.state.is_completed = true;
            self.state.conclusion = Some(shortcut.clone());
            self.publish().await;
            self.kind.update_chat_env(&shortcut, &mut env)?;
            return Ok(env);
        }

        if self.kind.is_human_escalation() {
            self.status.transition(PhaseStatus::AwaitingHumanInput)?;
            self.publish().await;
            let review = self
                .context
                .control
                .collect_review(env.get_or_empty("codes"))
                .await?;
            match review {
                Some(comments) => {
                    info!(phase = self.kind.as_str(), "Resuming with reviewer comments");
                    placeholders.insert("comments".to_string(), comments);
                }
                None => {
                    info!(phase = self.kind.as_str(), "Reviewer exited, leaving phase untouched");
                    self.status.transition(PhaseStatus::Init)?;
                    self.publish().await;
                    return Ok(env);
                }
            }
        }

        let mut conclusion = self
            .chatting(&env, turn_limit, need_reflect, placeholders.clone())
            .await?;

        // The control surface may send the dialogue back around with a
        // fresh seed any number of times before accepting.
        loop {
            let decision = self
                .context
                .control
                .decide(self.kind.as_str(), &self.state)
                .await?;
            match decision {
                ControlDecision::Continue => {
                    self.accept_conclusion();
                    break;
                }
                ControlDecision::Restart { prompt } => {
                    self.request_restart(prompt)?;
                    conclusion = self
                        .chatting(&env, turn_limit, need_reflect, placeholders.clone())
                        .await?;
                }
            }
        }

        self.kind.update_chat_env(&conclusion, &mut env)?;

        self.persist_conclusion(&conclusion).await;
        self.status.transition(PhaseStatus::Persisted)?;
        self.publish().await;

        Ok(env)
    }

    /// Run the phase dialogue until a conclusion settles.
    ///
    /// Preconditions: both roles recruited, `turn_limit` within
    /// `1..=MAX_TURN_LIMIT`. A queued restart is consumed here: its
    /// prompt replaces the seed message and both restart fields clear.
    ///
    /// # Errors
    ///
    /// Fails fast on violated preconditions and propagates backend
    /// errors from either agent.
    pub async fn chatting(
        &mut self,
        env: &ChainEnv,
        turn_limit: usize,
        need_reflect: bool,
        mut placeholders: HashMap<String, String>,
    ) -> PhaseResult<String> {
        if self.status == PhaseStatus::RestartRequested {
            self.status.transition(PhaseStatus::Init)?;
        }

        self.state.task_prompt = env.task_prompt().to_string();
        self.state.current_turn = 0;
        self.state.is_completed = false;
        self.state.conclusion = None;

        let seed_override = if self.state.needs_restart {
            let prompt = self.state.restart_prompt.take().filter(|p| !p.is_empty());
            self.state.needs_restart = false;
            if prompt.is_some() {
                info!(phase = self.kind.as_str(), "Restarting dialogue from operator prompt");
            }
            prompt
        } else {
            None
        };

        placeholders.insert("assistant_role".to_string(), self.assistant_role.clone());

        let assistant_role = self.assistant_role.clone();
        let user_role = self.user_role.clone();
        let prompt_template = self.phase_prompt.clone();
        let phase_label = self.kind.as_str().to_string();
        let outcome = self
            .run_dialogue(
                env,
                DialogueRequest {
                    assistant_role: &assistant_role,
                    user_role: &user_role,
                    prompt_template: &prompt_template,
                    phase_label: &phase_label,
                    placeholders: &placeholders,
                    seed_override,
                    turn_limit,
                    track_state: true,
                },
            )
            .await?;

        if outcome.declared.is_some() {
            self.status.transition(PhaseStatus::Completed)?;
        } else {
            self.status.transition(PhaseStatus::TerminatedByLimit)?;
        }

        let mut raw = outcome.declared.clone().unwrap_or_default();
        if need_reflect {
            if raw.is_empty() {
                let reflected = self.self_reflection(env, &outcome.transcript).await?;
                raw = format!("{TERMINATION_MARKER} {reflected}");
            }
            if self.kind.is_recruiting() && !contains_decision_token(&raw) {
                let reflected = self.self_reflection(env, &outcome.transcript).await?;
                raw = format!("{TERMINATION_MARKER} {reflected}");
            }
        } else if raw.is_empty() {
            raw = outcome.last_assistant.clone();
        }

        let conclusion = extract_conclusion(&raw).to_string();

        if self.status == PhaseStatus::TerminatedByLimit {
            self.status.transition(PhaseStatus::Completed)?;
        }
        self.state.conclusion = Some(conclusion.clone());
        self.state.is_completed = true;
        self.publish().await;

        info!(
            phase = self.kind.as_str(),
            turns = self.state.current_turn,
            declared = outcome.declared.is_some(),
            conclusion_chars = conclusion.chars().count(),
            "Dialogue settled"
        );
        Ok(conclusion)
    }

    /// One bounded exchange loop between a freshly built role pair.
    async fn run_dialogue(
        &mut self,
        env: &ChainEnv,
        request: DialogueRequest<'_>,
    ) -> PhaseResult<DialogueOutcome> {
        if !(1..=MAX_TURN_LIMIT).contains(&request.turn_limit) {
            return Err(PhaseError::TurnLimitOutOfRange(request.turn_limit));
        }
        for role in [request.assistant_role, request.user_role] {
            if !env.is_recruited(role) {
                return Err(PhaseError::RoleNotRecruited(role.to_string()));
            }
        }

        let mut session = self.build_session(&request);
        let mut input = session.init_chat(request.prompt_template, request.placeholders);
        if let Some(seed) = request.seed_override {
            debug!(phase = request.phase_label, "Seeding dialogue with restart prompt");
            input = ChatMessage::user(request.user_role, seed);
        }

        let mut declared: Option<String> = None;
        let mut last_assistant = String::new();

        for turn in 1..=request.turn_limit {
            if request.track_state {
                self.state.current_turn = turn;
                self.status.transition(PhaseStatus::Running(turn))?;
                self.publish().await;
            }

            let (assistant, user) = session.step(&input, request.turn_limit == 1).await?;

            if let Some(message) = assistant.messages.first() {
                last_assistant = message.content.clone();
                if assistant.declared_conclusion {
                    declared = Some(message.content.clone());
                    break;
                }
            }
            if assistant.terminated {
                debug!(
                    phase = request.phase_label,
                    turn, "Assistant terminated without declaring a conclusion"
                );
                break;
            }
            if let Some(message) = user.messages.first() {
                if user.declared_conclusion {
                    declared = Some(message.content.clone());
                    break;
                }
            }
            if user.terminated {
                debug!(
                    phase = request.phase_label,
                    turn, "User terminated without declaring a conclusion"
                );
                break;
            }

            if request.turn_limit == 1 {
                break;
            }
            match user.messages.first() {
                Some(message) => input = message.clone(),
                None => break,
            }
        }

        // The longer history saw every exchange, including the one that
        // may have ended the dialogue.
        let assistant_history = session.assistant().history();
        let user_history = session.user().history();
        let transcript = if user_history.len() > assistant_history.len() {
            user_history.transcript()
        } else {
            assistant_history.transcript()
        };

        Ok(DialogueOutcome {
            declared,
            last_assistant,
            transcript,
        })
    }

    /// Force a conclusion out of an unconcluded dialogue by having a
    /// fixed reviewer pair read the transcript and answer the phase's
    /// reflection question in a single turn.
    async fn self_reflection(&mut self, env: &ChainEnv, transcript: &str) -> PhaseResult<String> {
        let question = self.kind.reflection_question()?;
        info!(phase = self.kind.as_str(), "Reflecting to force a conclusion");

        let mut placeholders = HashMap::new();
        placeholders.insert("conversations".to_string(), transcript.to_string());
        placeholders.insert("question".to_string(), question.to_string());

        let outcome = self
            .run_dialogue(
                env,
                DialogueRequest {
                    assistant_role: REFLECTION_ASSISTANT_ROLE,
                    user_role: REFLECTION_USER_ROLE,
                    prompt_template: REFLECTION_PROMPT,
                    phase_label: REFLECTION_PHASE_NAME,
                    placeholders: &placeholders,
                    seed_override: None,
                    turn_limit: 1,
                    track_state: false,
                },
            )
            .await?;

        let raw = match outcome.declared {
            Some(content) => content,
            None => format!("{TERMINATION_MARKER} {}", outcome.last_assistant),
        };
        let reflected = extract_conclusion(&raw).to_string();

        if self.kind.is_recruiting() {
            if reflected.to_lowercase().contains("yes") {
                return Ok("Yes".to_string());
            }
            return Ok("No".to_string());
        }
        Ok(reflected)
    }

    fn build_session(&self, request: &DialogueRequest<'_>) -> DialogueSession {
        let assistant = self.build_agent(
            request.assistant_role,
            RoleKind::Assistant,
            request.phase_label,
            request.placeholders,
        );
        let user = self.build_agent(
            request.user_role,
            RoleKind::User,
            request.phase_label,
            request.placeholders,
        );
        DialogueSession::new(assistant, user)
    }

    fn build_agent(
        &self,
        role_name: &str,
        role_kind: RoleKind,
        phase_label: &str,
        placeholders: &HashMap<String, String>,
    ) -> DialogueAgent {
        let persona = self
            .context
            .role_prompts
            .get(role_name)
            .map(|template| render_placeholders(template, placeholders))
            .unwrap_or_default();
        let background = render_placeholders(&self.context.background_prompt, placeholders);
        let system_prompt = if persona.is_empty() {
            background
        } else {
            format!("{background}\n\n{persona}")
        };

        DialogueAgent::new(
            role_name,
            role_kind,
            system_prompt,
            phase_label,
            self.context.backend.clone(),
            self.context.settings.clone(),
        )
        .with_retriever(self.context.retriever.clone())
    }

    /// Best effort: failures are logged, never surfaced.
    async fn persist_conclusion(&self, conclusion: &str) {
        if conclusion.is_empty() {
            debug!(phase = self.kind.as_str(), "Empty conclusion, nothing to persist");
            return;
        }

        let embedding = match self.context.embedding.embed(conclusion).await {
            Ok(vector) => vector,
            Err(error) => {
                warn!(
                    phase = self.kind.as_str(),
                    %error,
                    "Embedding failed, persisting conclusion without one"
                );
                Vec::new()
            }
        };

        let role_pair = format!("{}<->{}", self.user_role, self.assistant_role);
        let record = ConclusionRecord::new(
            self.kind.as_str(),
            role_pair,
            conclusion,
            self.kind.content_kind(),
        )
        .with_embedding(embedding);

        let phase_id = match self
            .context
            .store
            .find_or_create_phase(self.kind.as_str(), &self.phase_prompt)
            .await
        {
            Ok(id) => id,
            Err(error) => {
                warn!(
                    phase = self.kind.as_str(),
                    %error,
                    "Phase row lookup failed, conclusion not persisted"
                );
                return;
            }
        };

        match self.context.store.insert_conclusion(phase_id, &record).await {
            Ok(id) => {
                debug!(phase = self.kind.as_str(), conclusion_id = id, "Conclusion persisted");
            }
            Err(error) => {
                warn!(
                    phase = self.kind.as_str(),
                    %error,
                    "Conclusion insert failed, continuing without memory"
                );
            }
        }
    }

    async fn publish(&self) {
        self.context
            .registry
            .publish(self.kind.as_str(), self.status, &self.state)
            .await;
    }
}
