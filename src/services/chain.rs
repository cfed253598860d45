//! Chain runner: executes the configured phase sequence over one shared
//! environment.
//!
//! The chain owns the environment for the whole run. Every phase gets
//! the environment by value and hands back the mutated copy; cycled
//! groups (review, test) repeat their phases up to a bounded count and
//! may stop early when a phase settles the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::{ChainConfig, ChainEnv, ChainStep, PhaseStepConfig};
use crate::services::phase_engine::{PhaseContext, PhaseEngine};
use crate::services::phase_kinds::PhaseKind;

/// Wall-clock record for one executed phase.
#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub phase_name: String,
    pub turns: usize,
    pub elapsed: Duration,
}

/// What one executed step left behind, for cycle bookkeeping.
struct ExecutedStep {
    kind: PhaseKind,
    conclusion: Option<String>,
}

/// Drives the configured phases in order over a shared environment.
pub struct PhaseChain {
    run_id: Uuid,
    config: ChainConfig,
    context: Arc<PhaseContext>,
    env: ChainEnv,
    timings: Vec<PhaseTiming>,
    started_at: Option<Instant>,
}

impl PhaseChain {
    pub fn new(
        task_prompt: impl Into<String>,
        config: ChainConfig,
        context: Arc<PhaseContext>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            context,
            env: ChainEnv::new(task_prompt),
            timings: Vec::new(),
            started_at: None,
        }
    }

    pub fn env(&self) -> &ChainEnv {
        &self.env
    }

    pub fn timings(&self) -> &[PhaseTiming] {
        &self.timings
    }

    /// Hand the final environment to the caller once the run is over.
    pub fn into_env(self) -> ChainEnv {
        self.env
    }

    /// Mark the start of the run and log the effective setup.
    pub fn pre_processing(&mut self) {
        self.started_at = Some(Instant::now());
        let phase_count: usize = self
            .config
            .phases
            .iter()
            .map(|entry| entry.phase_steps().len())
            .sum();
        info!(
            run = %self.run_id,
            task = %self.env.task_prompt(),
            phases = phase_count,
            roles = self.config.recruitments.len(),
            model = self.context.backend.model(),
            "Starting chain run"
        );
    }

    /// Register every configured role as an active participant.
    pub fn make_recruitment(&mut self) {
        for role in &self.config.recruitments {
            self.env.recruit(role.as_str());
        }
        debug!(roles = self.config.recruitments.len(), "Recruited chain roles");
    }

    /// Run every configured entry in order.
    ///
    /// # Errors
    ///
    /// Stops at the first phase failure; the environment keeps every
    /// mutation made by the phases that completed before it.
    pub async fn execute_chain(&mut self) -> PhaseResult<()> {
        let entries = self.config.phases.clone();
        for entry in &entries {
            match entry {
                ChainStep::Single(step) => {
                    self.execute_step(step).await?;
                }
                ChainStep::Cycle(cycle) => {
                    'rounds: for round in 1..=cycle.cycles {
                        debug!(cycle = %cycle.name, round, "Starting cycle round");
                        for step in &cycle.phases {
                            let executed = self.execute_step(step).await?;
                            let conclusion = executed.conclusion.unwrap_or_default();
                            if executed.kind.breaks_cycle(&conclusion) {
                                info!(cycle = %cycle.name, round, "Cycle settled early");
                                break 'rounds;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Log the run summary and release the active-phase slot.
    pub async fn post_processing(&mut self) {
        for timing in &self.timings {
            info!(
                phase = %timing.phase_name,
                turns = timing.turns,
                elapsed_ms = timing.elapsed.as_millis() as u64,
                "Phase finished"
            );
        }
        let dialogue_time: Duration = self.timings.iter().map(|t| t.elapsed).sum();
        let wall_time = self
            .started_at
            .map_or(dialogue_time, |started| started.elapsed());
        info!(
            run = %self.run_id,
            phases = self.timings.len(),
            total_ms = wall_time.as_millis() as u64,
            "Chain run finished"
        );
        self.context.registry.clear().await;
    }

    async fn execute_step(&mut self, step: &PhaseStepConfig) -> PhaseResult<ExecutedStep> {
        let kind = PhaseKind::from_str(&step.kind)
            .ok_or_else(|| PhaseError::UnknownPhase(step.kind.clone()))?;
        let prompt = self
            .config
            .phase_prompts
            .get(kind.as_str())
            .ok_or_else(|| PhaseError::UnknownPhase(step.kind.clone()))?
            .clone();
        let turn_limit = step.turn_limit.unwrap_or(self.config.default_turn_limit);

        let mut engine = PhaseEngine::new(
            self.context.clone(),
            kind,
            prompt,
            step.assistant_role.as_str(),
            step.user_role.as_str(),
        );

        let started = Instant::now();
        // The engine gets a copy; a failed phase leaves the chain env at
        // its pre-phase state.
        let env = self.env.clone();
        self.env = engine.execute(env, turn_limit, step.need_reflect).await?;

        let state = engine.state();
        self.timings.push(PhaseTiming {
            phase_name: kind.as_str().to_string(),
            turns: state.current_turn,
            elapsed: started.elapsed(),
        });
        Ok(ExecutedStep {
            kind,
            conclusion: state.conclusion.clone(),
        })
    }
}
