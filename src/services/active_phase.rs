//! Single-slot registry naming the phase that currently drives a run.
//!
//! Only one phase executes at a time, so the registry holds at most one
//! snapshot. The executing engine republishes after every observable
//! change; readers always get a copy, never a live reference into the
//! engine's own state.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::models::{PhaseState, PhaseStatus};

/// Point-in-time view of the executing phase.
#[derive(Debug, Clone)]
pub struct ActivePhase {
    pub phase_name: String,
    pub status: PhaseStatus,
    pub state: PhaseState,
    pub updated_at: DateTime<Utc>,
}

/// Mutex-guarded slot for the currently executing phase.
#[derive(Debug, Default)]
pub struct ActivePhaseRegistry {
    slot: Mutex<Option<ActivePhase>>,
}

impl ActivePhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot with a fresh snapshot of `phase_name`.
    pub async fn publish(&self, phase_name: &str, status: PhaseStatus, state: &PhaseState) {
        let mut slot = self.slot.lock().await;
        *slot = Some(ActivePhase {
            phase_name: phase_name.to_string(),
            status,
            state: state.clone(),
            updated_at: Utc::now(),
        });
    }

    /// Snapshot of the executing phase, if any.
    pub async fn current(&self) -> Option<ActivePhase> {
        self.slot.lock().await.clone()
    }

    /// Empty the slot, typically once a chain run finishes.
    pub async fn clear(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }
}
