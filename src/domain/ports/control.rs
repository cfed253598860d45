//! Control surface port for driver intervention.
//!
//! After a dialogue settles, the driver may accept the conclusion or
//! demand a rerun with fresh guidance. Human-escalation phases also go
//! through this port to collect reviewer comments, so the engine never
//! blocks on stdin itself.

use async_trait::async_trait;

use crate::domain::errors::PhaseResult;
use crate::domain::models::PhaseState;

/// Verdict returned by the control surface after a dialogue settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlDecision {
    /// Accept the conclusion and move on.
    Continue,
    /// Discard the conclusion and rerun the dialogue, seeding it with
    /// the given guidance instead of the rendered phase prompt.
    Restart { prompt: String },
}

/// Port trait for the dialogue control surface.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Decide whether a settled dialogue stands or reruns.
    ///
    /// # Arguments
    /// * `phase_name` - Name of the phase under review
    /// * `state` - Settled phase state, conclusion included
    async fn decide(&self, phase_name: &str, state: &PhaseState) -> PhaseResult<ControlDecision>;

    /// Collect comments from a human reviewer for an escalation phase.
    ///
    /// Returns `None` when the reviewer declines, which abandons the
    /// escalation and leaves the environment unchanged.
    ///
    /// # Arguments
    /// * `codes` - Current code artifact shown to the reviewer
    async fn collect_review(&self, codes: &str) -> PhaseResult<Option<String>>;
}

/// Control surface that always accepts and never supplies review
/// comments. Used for unattended runs.
#[derive(Debug, Clone, Default)]
pub struct AutoControl;

impl AutoControl {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ControlSurface for AutoControl {
    async fn decide(&self, _phase_name: &str, _state: &PhaseState) -> PhaseResult<ControlDecision> {
        Ok(ControlDecision::Continue)
    }

    async fn collect_review(&self, _codes: &str) -> PhaseResult<Option<String>> {
        Ok(None)
    }
}
