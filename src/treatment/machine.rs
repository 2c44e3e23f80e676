//! # Delivery Treatment State Machine
//!
//! Concrete workflow on top of [`FsmEngine`]. Declaration order inside each
//! `(state, event)` group is the business priority:
//!
//! - `ASK_NON_DELIVERY_REASON` + `REASON_CODE`: reason 6 (detail) first, then reasons that
//!   need a photo, then reasons that close immediately. Codes outside 1..6 match no guard.
//! - `ASK_REASON_DETAIL` + `REASON_DETAIL_TEXT`: photo branch first, then close. A blank
//!   detail matches neither.
//! - `ASK_PHOTO` + photo signals: only a signal for the active trip is accepted.
//!
//! `START_TREATMENT` is only declared from `IDLE`; [`DeliveryTreatmentMachine::start_treatment`]
//! resets to `IDLE` and submits it under the same lock, which makes it valid from any state.

use std::sync::Arc;

use tracing::{error, warn};

use crate::delivery::{DeliveryContext, DeliveryRules};
use crate::error::{TreatmentError, TreatmentResult};
use crate::events::MessagePublisher;
use crate::state_machine::{
    EngineSnapshot, FsmEngine, StateMachineResult, Transition, TransitionOutcome,
    TransitionTable,
};
use crate::constants::TREATMENT_MACHINE_NAME;

use super::actions::{
    AskCompletionAction, AskReasonAction, FinalizeTreatmentAction, MarkCompletedAction,
    RecordDetailAndCloseAction, RecordDetailAskPhotoAction, RecordPhotoAction,
    RecordReasonAndCloseAction, RecordReasonAskDetailAction, RecordReasonAskPhotoAction,
};
use super::events::{TreatmentEvent, TreatmentEventKind};
use super::guards::{
    DetailNeedsPhotoGuard, DetailProvidedGuard, ReasonClosesGuard, ReasonNeedsDetailGuard,
    ReasonNeedsPhotoGuard, SignalMatchesTripGuard,
};
use super::messages::OutboundMessage;
use super::states::TreatmentState;

pub type TreatmentTable =
    TransitionTable<TreatmentState, TreatmentEvent, DeliveryContext, OutboundMessage>;
pub type TreatmentEngine =
    FsmEngine<TreatmentState, TreatmentEvent, DeliveryContext, OutboundMessage>;
pub type TreatmentOutcome = TransitionOutcome<TreatmentState, OutboundMessage>;

type Row = Transition<TreatmentState, TreatmentEvent, DeliveryContext, OutboundMessage>;

/// Build the treatment transition table for the given rules
pub fn build_treatment_transitions(rules: Arc<DeliveryRules>) -> StateMachineResult<TreatmentTable> {
    use TreatmentEventKind as Ev;
    use TreatmentState as St;

    TransitionTable::builder()
        .transition(
            Row::new(St::Idle, Ev::StartTreatment, St::AskDeliveryCompletion)
                .with_action(AskCompletionAction),
        )
        .transition(
            Row::new(St::AskDeliveryCompletion, Ev::ConfirmYes, St::Finalize)
                .with_action(MarkCompletedAction),
        )
        .transition(
            Row::new(St::AskDeliveryCompletion, Ev::ConfirmNo, St::AskNonDeliveryReason)
                .with_action(AskReasonAction),
        )
        .transition(
            Row::new(St::AskNonDeliveryReason, Ev::ReasonCode, St::AskReasonDetail)
                .guarded_by(ReasonNeedsDetailGuard)
                .with_action(RecordReasonAskDetailAction),
        )
        .transition(
            Row::new(St::AskNonDeliveryReason, Ev::ReasonCode, St::AskPhoto)
                .guarded_by(ReasonNeedsPhotoGuard::new(Arc::clone(&rules)))
                .with_action(RecordReasonAskPhotoAction),
        )
        .transition(
            Row::new(St::AskNonDeliveryReason, Ev::ReasonCode, St::Finalize)
                .guarded_by(ReasonClosesGuard::new(Arc::clone(&rules)))
                .with_action(RecordReasonAndCloseAction),
        )
        .transition(
            Row::new(St::AskReasonDetail, Ev::ReasonDetailText, St::AskPhoto)
                .guarded_by(DetailNeedsPhotoGuard::new(Arc::clone(&rules)))
                .with_action(RecordDetailAskPhotoAction),
        )
        .transition(
            Row::new(St::AskReasonDetail, Ev::ReasonDetailText, St::Finalize)
                .guarded_by(DetailProvidedGuard)
                .with_action(RecordDetailAndCloseAction),
        )
        .transition(
            Row::new(St::AskPhoto, Ev::PhotoTaken, St::Finalize)
                .guarded_by(SignalMatchesTripGuard)
                .with_action(RecordPhotoAction),
        )
        .transition(
            Row::new(St::AskPhoto, Ev::PhotoNotTaken, St::Finalize)
                .guarded_by(SignalMatchesTripGuard)
                .with_action(RecordPhotoAction),
        )
        .on_enter(St::Finalize, FinalizeTreatmentAction::new(rules))
        .build()
}

/// One delivery treatment workflow instance, owned by a single voice session
pub struct DeliveryTreatmentMachine {
    engine: TreatmentEngine,
    publisher: Arc<dyn MessagePublisher>,
}

impl std::fmt::Debug for DeliveryTreatmentMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTreatmentMachine")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl DeliveryTreatmentMachine {
    pub fn new(rules: DeliveryRules, publisher: Arc<dyn MessagePublisher>) -> TreatmentResult<Self> {
        let table = build_treatment_transitions(Arc::new(rules))?;
        Ok(Self::with_table(Arc::new(table), publisher))
    }

    /// Create an instance sharing an already built table
    pub fn with_table(table: Arc<TreatmentTable>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self {
            engine: FsmEngine::new(
                TREATMENT_MACHINE_NAME,
                TreatmentState::Idle,
                table,
                DeliveryContext::idle(),
            ),
            publisher,
        }
    }

    /// Start (or restart) a treatment for a trip and return the first prompt.
    ///
    /// Any unfinished treatment on this instance is discarded.
    pub async fn start_treatment(
        &self,
        trip_id: impl Into<String>,
        address: impl Into<String>,
    ) -> TreatmentResult<String> {
        let context = DeliveryContext::new(trip_id, address);
        let outcome = self
            .engine
            .reset_with(context, &TreatmentEvent::StartTreatment)
            .await?;

        match outcome {
            TransitionOutcome::Accepted {
                prompt, messages, ..
            } => {
                self.publish_all(messages).await;
                Ok(prompt)
            }
            TransitionOutcome::Rejected { state, reason } => Err(TreatmentError::GuardRejection {
                state,
                event: TreatmentEventKind::StartTreatment.to_string(),
                reason,
            }),
        }
    }

    /// Submit a classified event.
    ///
    /// A rejection is returned as `Ok(Rejected)`. A failed action is a defect: the
    /// treatment is restarted for the same trip and `ContextInvariantViolation` returned.
    pub async fn submit(&self, event: &TreatmentEvent) -> TreatmentResult<TreatmentOutcome> {
        let result = self.engine.process_event(event).await;
        self.settle(event, result).await
    }

    /// Submit an event carrying an idempotency id
    pub async fn submit_once(
        &self,
        event: &TreatmentEvent,
        event_id: &str,
    ) -> TreatmentResult<TreatmentOutcome> {
        let result = self.engine.process_event_once(event, event_id).await;
        self.settle(event, result).await
    }

    /// Submit an event classified against the snapshot taken at `generation`.
    ///
    /// A restart in between rejects it as superseded, so an answer to the previous trip's
    /// question never lands on the new trip.
    pub async fn submit_at(
        &self,
        generation: u64,
        event: &TreatmentEvent,
    ) -> TreatmentResult<TreatmentOutcome> {
        let result = self.engine.process_event_at(generation, event).await;
        self.settle(event, result).await
    }

    /// The current step's prompt, verbatim. Never changes state or context.
    pub async fn reprompt(&self) -> String {
        self.engine.current_prompt().await
    }

    pub async fn state(&self) -> TreatmentState {
        self.engine.current_state().await
    }

    pub async fn context(&self) -> DeliveryContext {
        self.engine.context().await
    }

    pub async fn snapshot(&self) -> EngineSnapshot<TreatmentState, DeliveryContext> {
        self.engine.snapshot().await
    }

    pub async fn is_active(&self) -> bool {
        self.state().await.is_active()
    }

    async fn settle(
        &self,
        event: &TreatmentEvent,
        result: StateMachineResult<TreatmentOutcome>,
    ) -> TreatmentResult<TreatmentOutcome> {
        match result {
            Ok(outcome) => {
                if let TransitionOutcome::Accepted { messages, .. } = &outcome {
                    self.publish_all(messages.clone()).await;
                }
                Ok(outcome)
            }
            Err(err) => {
                let context = self.engine.context().await;
                error!(
                    trip_id = %context.trip_id,
                    event = event.event_type(),
                    error = %err,
                    "Treatment defect, restarting workflow"
                );
                self.start_treatment(context.trip_id, context.address).await?;
                Err(TreatmentError::ContextInvariantViolation(err.to_string()))
            }
        }
    }

    async fn publish_all(&self, messages: Vec<OutboundMessage>) {
        for message in messages {
            let message_type = message.message_type();
            if let Err(err) = self.publisher.publish(message).await {
                warn!(message_type, error = %err, "Failed to publish outbound message");
            }
        }
    }
}
