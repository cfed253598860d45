//! Phase execution status machine and mutable phase state.

use crate::domain::errors::{PhaseError, PhaseResult};
use serde::{Deserialize, Serialize};

/// Where a phase execution currently stands.
///
/// `RestartRequested` is reachable from every status via external control;
/// it returns the engine to `Init` with an injected restart prompt.
/// `Persisted` is the only terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "turn")]
pub enum PhaseStatus {
    Init,
    Running(usize),
    Completed,
    TerminatedByLimit,
    AwaitingHumanInput,
    Persisted,
    RestartRequested,
}

impl PhaseStatus {
    /// Whether the phase can move from `self` to `to`.
    pub fn can_transition_to(&self, to: &Self) -> bool {
        // External control may always request a restart.
        if matches!(to, Self::RestartRequested) {
            return true;
        }
        match (self, to) {
            (Self::Init, Self::Running(1) | Self::AwaitingHumanInput) => true,
            (Self::Running(from), Self::Running(to_turn)) => *to_turn == from + 1,
            (Self::Running(_), Self::Completed | Self::TerminatedByLimit) => true,
            // Limit exhaustion may still be rescued by reflection before persisting.
            (Self::Completed | Self::TerminatedByLimit, Self::Persisted) => true,
            (Self::TerminatedByLimit, Self::Completed) => true,
            (Self::AwaitingHumanInput, Self::Running(1) | Self::Init) => true,
            (Self::RestartRequested, Self::Init) => true,
            _ => false,
        }
    }

    /// Attempt the transition, failing with a typed error when the move is
    /// not allowed.
    pub fn transition(&mut self, to: Self) -> PhaseResult<()> {
        if self.can_transition_to(&to) {
            *self = to;
            Ok(())
        } else {
            Err(PhaseError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
                reason: "transition not permitted by the phase lifecycle".to_string(),
            })
        }
    }

    /// Only a persisted phase is final.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Running(turn) => write!(f, "running(turn={turn})"),
            Self::Completed => write!(f, "completed"),
            Self::TerminatedByLimit => write!(f, "terminated_by_limit"),
            Self::AwaitingHumanInput => write!(f, "awaiting_human_input"),
            Self::Persisted => write!(f, "persisted"),
            Self::RestartRequested => write!(f, "restart_requested"),
        }
    }
}

/// Mutable state one phase carries across its turn loop, reflection, and
/// the external control surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    /// Task the chain is working on.
    pub task_prompt: String,

    /// 1-based turn counter; 0 before the first exchange.
    pub current_turn: usize,

    pub is_completed: bool,

    /// When set, the next turn loop consumes `restart_prompt` as its seed
    /// message instead of the rendered phase prompt.
    pub needs_restart: bool,

    pub restart_prompt: Option<String>,

    /// Conclusion extracted from the dialogue, once one exists.
    pub conclusion: Option<String>,

    /// Derived document rendered by a downstream driver; discarded on
    /// restart.
    pub document: Option<String>,
}

impl PhaseState {
    /// Zero every field back to construction state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply a partial update; `None` fields are left untouched.
    pub fn apply(&mut self, update: PhaseStateUpdate) {
        if let Some(task_prompt) = update.task_prompt {
            self.task_prompt = task_prompt;
        }
        if let Some(current_turn) = update.current_turn {
            self.current_turn = current_turn;
        }
        if let Some(is_completed) = update.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(needs_restart) = update.needs_restart {
            self.needs_restart = needs_restart;
        }
        if let Some(restart_prompt) = update.restart_prompt {
            self.restart_prompt = restart_prompt;
        }
        if let Some(conclusion) = update.conclusion {
            self.conclusion = conclusion;
        }
        if let Some(document) = update.document {
            self.document = document;
        }
    }
}

/// Partial update for [`PhaseState`]; the outer `Option` selects the field,
/// the inner value (itself optional for clearable fields) is written as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseStateUpdate {
    pub task_prompt: Option<String>,
    pub current_turn: Option<usize>,
    pub is_completed: Option<bool>,
    pub needs_restart: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_prompt: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut status = PhaseStatus::Init;
        status.transition(PhaseStatus::Running(1)).unwrap();
        status.transition(PhaseStatus::Running(2)).unwrap();
        status.transition(PhaseStatus::Completed).unwrap();
        status.transition(PhaseStatus::Persisted).unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn test_turn_numbers_must_increment() {
        let mut status = PhaseStatus::Running(1);
        assert!(status.transition(PhaseStatus::Running(3)).is_err());
        status.transition(PhaseStatus::Running(2)).unwrap();
    }

    #[test]
    fn test_restart_reachable_from_everywhere() {
        for status in [
            PhaseStatus::Init,
            PhaseStatus::Running(4),
            PhaseStatus::Completed,
            PhaseStatus::TerminatedByLimit,
            PhaseStatus::AwaitingHumanInput,
            PhaseStatus::Persisted,
        ] {
            assert!(status.can_transition_to(&PhaseStatus::RestartRequested));
        }
    }

    #[test]
    fn test_restart_returns_to_init() {
        let mut status = PhaseStatus::RestartRequested;
        status.transition(PhaseStatus::Init).unwrap();
        assert_eq!(status, PhaseStatus::Init);
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut status = PhaseStatus::Init;
        let err = status.transition(PhaseStatus::Completed).unwrap_err();
        assert!(err.to_string().contains("init"));
    }

    #[test]
    fn test_human_input_resumes_or_exits() {
        assert!(PhaseStatus::AwaitingHumanInput.can_transition_to(&PhaseStatus::Running(1)));
        assert!(PhaseStatus::AwaitingHumanInput.can_transition_to(&PhaseStatus::Init));
        assert!(!PhaseStatus::AwaitingHumanInput.can_transition_to(&PhaseStatus::Persisted));
    }

    #[test]
    fn test_state_reset_zeroes_fields() {
        let mut state = PhaseState {
            task_prompt: "build a note app".to_string(),
            current_turn: 7,
            is_completed: true,
            needs_restart: true,
            restart_prompt: Some("again".to_string()),
            conclusion: Some("PowerPoint".to_string()),
            document: Some("# doc".to_string()),
        };
        state.reset();
        assert_eq!(state, PhaseState::default());
    }

    #[test]
    fn test_partial_update_touches_selected_fields_only() {
        let mut state = PhaseState::default();
        state.apply(PhaseStateUpdate {
            current_turn: Some(3),
            is_completed: Some(true),
            ..Default::default()
        });
        assert_eq!(state.current_turn, 3);
        assert!(state.is_completed);
        assert_eq!(state.task_prompt, "");
    }

    #[test]
    fn test_update_can_clear_restart_prompt() {
        let mut state = PhaseState {
            restart_prompt: Some("X".to_string()),
            ..Default::default()
        };
        state.apply(PhaseStateUpdate {
            restart_prompt: Some(None),
            ..Default::default()
        });
        assert_eq!(state.restart_prompt, None);
    }
}
