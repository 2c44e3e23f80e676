use thiserror::Error;

use crate::state_machine::{RejectionReason, StateMachineError};
use crate::treatment::TreatmentState;
use crate::turn::ClassificationFailure;

/// Crate-level error type.
///
/// The first four variants are the workflow-local taxonomy. They are absorbed by the turn
/// controller and only ever surface to the driver as a repeated question.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreatmentError {
    #[error("Classification failed in state {state}: {failure}")]
    Classification {
        state: TreatmentState,
        failure: ClassificationFailure,
    },

    #[error("Event {event} rejected in state {state}: {reason}")]
    GuardRejection {
        state: TreatmentState,
        event: String,
        reason: RejectionReason,
    },

    #[error("Context invariant violated: {0}")]
    ContextInvariantViolation(String),

    #[error("Stale signal for trip {trip_id} in state {state}")]
    StaleSignal {
        trip_id: String,
        state: TreatmentState,
    },

    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Speech output failed: {0}")]
    Speech(String),
}

impl TreatmentError {
    /// Recoverable by simply repeating the current question
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Classification { .. } | Self::GuardRejection { .. } | Self::StaleSignal { .. }
        )
    }
}

impl From<serde_json::Error> for TreatmentError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMessage(err.to_string())
    }
}

pub type TreatmentResult<T> = std::result::Result<T, TreatmentError>;
