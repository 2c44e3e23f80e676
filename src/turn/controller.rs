//! # Turn Controller
//!
//! Decides, per utterance or external signal, whether the workflow advances or the driver
//! hears the current question again. Classification failures never reach the engine.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{TreatmentError, TreatmentResult};
use crate::state_machine::{RejectionReason, TransitionOutcome};
use crate::treatment::{DeliveryTreatmentMachine, TreatmentEvent, TreatmentState};

use super::classifier::InputClassifier;
use super::speech::SpeechSink;

/// Result of handling one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Advanced {
        from: TreatmentState,
        to: TreatmentState,
        prompt: String,
    },
    /// The current prompt was repeated verbatim
    Reprompted {
        prompt: String,
        cause: TreatmentError,
    },
    /// No treatment in progress; the utterance was not consumed
    Inactive,
}

/// Result of handling one photo signal from the app
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Applied { to: TreatmentState },
    /// Wrong trip or wrong state; ignored without a state change
    Stale { cause: TreatmentError },
    /// Event id seen before
    Duplicate,
    /// An action failed and the treatment was restarted for the same trip
    Restarted { cause: TreatmentError },
}

pub struct TurnController {
    machine: Arc<DeliveryTreatmentMachine>,
    classifier: InputClassifier,
    speech: Arc<dyn SpeechSink>,
}

impl TurnController {
    pub fn new(
        machine: Arc<DeliveryTreatmentMachine>,
        classifier: InputClassifier,
        speech: Arc<dyn SpeechSink>,
    ) -> Self {
        Self {
            machine,
            classifier,
            speech,
        }
    }

    pub fn machine(&self) -> &Arc<DeliveryTreatmentMachine> {
        &self.machine
    }

    /// Start a treatment and speak its first question
    pub async fn start(&self, trip_id: &str, address: &str) -> TreatmentResult<String> {
        let prompt = self.machine.start_treatment(trip_id, address).await?;
        self.speech.say(&prompt).await?;
        Ok(prompt)
    }

    pub async fn handle_utterance(&self, utterance: &str) -> TreatmentResult<TurnOutcome> {
        let snapshot = self.machine.snapshot().await;
        let state = snapshot.state;
        if !state.is_active() {
            return Ok(TurnOutcome::Inactive);
        }

        let event = match self.classifier.classify(state, utterance) {
            Ok(event) => event,
            Err(failure) => {
                debug!(state = %state, failure = %failure, "Utterance not classified");
                return self
                    .reprompt(TreatmentError::Classification { state, failure })
                    .await;
            }
        };

        match self.machine.submit_at(snapshot.generation, &event).await {
            Ok(TransitionOutcome::Accepted { from, to, prompt, .. }) => {
                self.speech.say(&prompt).await?;
                Ok(TurnOutcome::Advanced { from, to, prompt })
            }
            Ok(TransitionOutcome::Rejected { state, reason }) => {
                self.reprompt(TreatmentError::GuardRejection {
                    state,
                    event: event.event_type().to_string(),
                    reason,
                })
                .await
            }
            Err(err @ TreatmentError::ContextInvariantViolation(_)) => self.reprompt(err).await,
            Err(err) => Err(err),
        }
    }

    /// Apply a photo outcome reported by the app for `trip_id`
    pub async fn handle_photo_signal(
        &self,
        trip_id: &str,
        taken: bool,
        event_id: Option<&str>,
    ) -> TreatmentResult<SignalOutcome> {
        let event = TreatmentEvent::photo_signal(trip_id, taken);
        let result = match event_id {
            Some(id) => self.machine.submit_once(&event, id).await,
            None => self.machine.submit(&event).await,
        };

        match result {
            Ok(TransitionOutcome::Accepted { to, prompt, .. }) => {
                self.speech.say(&prompt).await?;
                Ok(SignalOutcome::Applied { to })
            }
            Ok(TransitionOutcome::Rejected {
                reason: RejectionReason::DuplicateEvent,
                ..
            }) => Ok(SignalOutcome::Duplicate),
            Ok(TransitionOutcome::Rejected { state, .. }) => {
                let cause = TreatmentError::StaleSignal {
                    trip_id: trip_id.to_string(),
                    state,
                };
                warn!(trip_id, state = %state, event = event.event_type(), "Ignoring stale photo signal");
                Ok(SignalOutcome::Stale { cause })
            }
            Err(cause @ TreatmentError::ContextInvariantViolation(_)) => {
                self.speech.say(&self.machine.reprompt().await).await?;
                Ok(SignalOutcome::Restarted { cause })
            }
            Err(err) => Err(err),
        }
    }

    async fn reprompt(&self, cause: TreatmentError) -> TreatmentResult<TurnOutcome> {
        let prompt = self.machine.reprompt().await;
        self.speech.say(&prompt).await?;
        Ok(TurnOutcome::Reprompted { prompt, cause })
    }
}
