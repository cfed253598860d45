pub mod active_phase;
pub mod agent;
pub mod chain;
pub mod phase_engine;
pub mod phase_kinds;
pub mod retrieval;
pub mod role_play;

pub use active_phase::{ActivePhase, ActivePhaseRegistry};
pub use agent::{AgentSettings, DialogueAgent, StepOutcome};
pub use chain::{PhaseChain, PhaseTiming};
pub use phase_engine::{PhaseContext, PhaseEngine, MAX_TURN_LIMIT};
pub use phase_kinds::PhaseKind;
pub use retrieval::{ConclusionRetriever, RetrievedConclusion};
pub use role_play::DialogueSession;
