//! Domain errors for the Colloquy phase engine.

use thiserror::Error;

/// Domain-level errors that can occur while driving a phase.
///
/// A token-budget overrun is deliberately absent: it is an expected outcome
/// carried on the step result (`StepOutcome::terminated` with a
/// `max_tokens_exceeded` reason), never an error.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Caller bug: a dialogue was requested for a role absent from the
    /// recruited set.
    #[error("Role not recruited: {0}")]
    RoleNotRecruited(String),

    /// Caller bug: the turn limit must stay within 1..=100.
    #[error("Turn limit {0} outside supported range 1..=100")]
    TurnLimitOutOfRange(usize),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Malformed or failed model-backend response; aborts the current
    /// `execute` and surfaces to the driver.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Reflection was requested for a phase kind with no extraction question.
    #[error("Reflection is not defined for phase kind {0}")]
    ReflectionUndefined(String),

    /// The configured chain names a phase kind the catalogue does not
    /// implement, or one without a prompt template.
    #[error("Unknown phase kind: {0}")]
    UnknownPhase(String),

    /// A coding phase concluded without any code artifact.
    #[error("No valid codes in conclusion")]
    NoValidCodes,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The human reviewer exited before submitting comments; the cycle is
    /// abandoned and the environment left unchanged.
    #[error("Human reviewer exited before submitting comments")]
    UserExit,
}

pub type PhaseResult<T> = Result<T, PhaseError>;

impl From<sqlx::Error> for PhaseError {
    fn from(err: sqlx::Error) -> Self {
        PhaseError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for PhaseError {
    fn from(err: serde_json::Error) -> Self {
        PhaseError::SerializationError(err.to_string())
    }
}
