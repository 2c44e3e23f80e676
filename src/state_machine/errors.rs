use thiserror::Error;

/// Error types for engine operations.
///
/// A transition that simply does not apply (no candidate, guards rejected, duplicate id)
/// is not an error; it is reported as a rejected [`TransitionOutcome`](super::TransitionOutcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Action execution failed: {reason}")]
    ActionFailed { reason: String },

    /// Raised while building a table whose declaration order makes a transition unreachable
    #[error("Invalid state transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

/// Specific error type for action execution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Context invariant violated: {invariant}")]
    InvariantViolation { invariant: String },

    #[error("Missing context field: {field}")]
    MissingContext { field: &'static str },

    #[error("Unexpected event {event} for action {action}")]
    UnexpectedEvent { action: &'static str, event: String },
}

impl From<ActionError> for StateMachineError {
    fn from(err: ActionError) -> Self {
        Self::ActionFailed {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type ActionResult<T> = Result<T, ActionError>;

/// Helper function to create invariant violations
pub fn invariant_violation(invariant: impl Into<String>) -> ActionError {
    ActionError::InvariantViolation {
        invariant: invariant.into(),
    }
}
