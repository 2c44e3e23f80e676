use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::constants::prompts;
use crate::delivery::{DeliveryContext, DeliveryRules, FailureReason, PhotoOutcome};
use crate::state_machine::errors::{invariant_violation, ActionError, ActionResult};
use crate::state_machine::{ActionOutput, StateAction};

use super::events::TreatmentEvent;
use super::messages::OutboundMessage;

pub type TreatmentOutput = ActionOutput<OutboundMessage>;

/// Reason carried by a `ReasonCode` event.
///
/// Guards only let codes 1..=6 through, so anything else reaching an action is a defect.
fn reason_from(event: &TreatmentEvent, action: &'static str) -> ActionResult<FailureReason> {
    match event {
        TreatmentEvent::ReasonCode(code) => FailureReason::from_code(*code)
            .ok_or_else(|| invariant_violation(format!("reason code {code} outside 1..6"))),
        other => Err(ActionError::UnexpectedEvent {
            action,
            event: other.event_type().to_string(),
        }),
    }
}

fn detail_from(event: &TreatmentEvent, action: &'static str) -> ActionResult<String> {
    match event {
        TreatmentEvent::ReasonDetailText(text) if !text.trim().is_empty() => {
            Ok(text.trim().to_string())
        }
        TreatmentEvent::ReasonDetailText(_) => Err(invariant_violation("detail text is blank")),
        other => Err(ActionError::UnexpectedEvent {
            action,
            event: other.event_type().to_string(),
        }),
    }
}

/// Closing prompt plus the `delivery_confirmed` notice sent whenever an answer closes the delivery
fn closing(context: &DeliveryContext, prompt: &str) -> TreatmentOutput {
    ActionOutput::prompt(prompt).with_message(OutboundMessage::delivery_confirmed(context))
}

/// Action asking whether the delivery was completed
pub struct AskCompletionAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for AskCompletionAction {
    fn execute(
        &self,
        _context: &mut DeliveryContext,
        _event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        Ok(ActionOutput::prompt(prompts::ASK_DELIVERY_COMPLETION))
    }

    fn description(&self) -> &'static str {
        "Ask whether the delivery was completed"
    }
}

/// Action to record a completed delivery
pub struct MarkCompletedAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for MarkCompletedAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        _event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        context.completed = true;
        Ok(closing(context, prompts::DELIVERY_CONFIRMED))
    }

    fn description(&self) -> &'static str {
        "Mark delivery as completed"
    }
}

/// Action listing the numbered non-delivery reasons
pub struct AskReasonAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for AskReasonAction {
    fn execute(
        &self,
        _context: &mut DeliveryContext,
        _event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        Ok(ActionOutput::prompt(prompts::ASK_NON_DELIVERY_REASON))
    }

    fn description(&self) -> &'static str {
        "Ask for a non-delivery reason"
    }
}

/// Action storing reason 6 and asking for a description
pub struct RecordReasonAskDetailAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for RecordReasonAskDetailAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        let reason = reason_from(event, self.description())?;
        if !DeliveryRules::requires_detail(reason) {
            return Err(invariant_violation(format!(
                "reason {} does not take a detail",
                reason.code()
            )));
        }
        context.failure_reason = Some(reason);
        Ok(ActionOutput::prompt(prompts::ASK_REASON_DETAIL))
    }

    fn description(&self) -> &'static str {
        "Record reason and ask for detail"
    }
}

/// Action storing a reason that needs photo proof and asking the app for a photo
pub struct RecordReasonAskPhotoAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for RecordReasonAskPhotoAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        context.failure_reason = Some(reason_from(event, self.description())?);
        Ok(ActionOutput::prompt(prompts::ASK_PHOTO).with_message(OutboundMessage::ask_photo(context)))
    }

    fn description(&self) -> &'static str {
        "Record reason and ask for a photo"
    }
}

/// Action storing a reason that closes the treatment
pub struct RecordReasonAndCloseAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for RecordReasonAndCloseAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        context.failure_reason = Some(reason_from(event, self.description())?);
        Ok(closing(context, prompts::DELIVERY_NOT_COMPLETED))
    }

    fn description(&self) -> &'static str {
        "Record reason and close"
    }
}

/// Action storing the detail text and asking for a photo
pub struct RecordDetailAskPhotoAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for RecordDetailAskPhotoAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        context.detail = Some(detail_from(event, self.description())?);
        Ok(ActionOutput::prompt(prompts::ASK_PHOTO).with_message(OutboundMessage::ask_photo(context)))
    }

    fn description(&self) -> &'static str {
        "Record detail and ask for a photo"
    }
}

/// Action storing the detail text and closing the treatment
pub struct RecordDetailAndCloseAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for RecordDetailAndCloseAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        context.detail = Some(detail_from(event, self.description())?);
        Ok(closing(context, prompts::DELIVERY_NOT_COMPLETED))
    }

    fn description(&self) -> &'static str {
        "Record detail and close"
    }
}

/// Action storing the photo outcome reported by the app
pub struct RecordPhotoAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for RecordPhotoAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        let (outcome, prompt) = match event {
            TreatmentEvent::PhotoTaken(_) => {
                (PhotoOutcome::Taken, prompts::DELIVERY_CONFIRMED_WITH_PHOTO)
            }
            TreatmentEvent::PhotoNotTaken(_) => {
                (PhotoOutcome::NotTaken, prompts::DELIVERY_NOT_COMPLETED)
            }
            other => {
                return Err(ActionError::UnexpectedEvent {
                    action: self.description(),
                    event: other.event_type().to_string(),
                })
            }
        };

        context.photo = Some(outcome);
        Ok(closing(context, prompt))
    }

    fn description(&self) -> &'static str {
        "Record photo outcome"
    }
}

/// Entry action for FINALIZE: verify the collected context and report the result
pub struct FinalizeTreatmentAction {
    rules: Arc<DeliveryRules>,
}

impl FinalizeTreatmentAction {
    pub fn new(rules: Arc<DeliveryRules>) -> Self {
        Self { rules }
    }
}

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for FinalizeTreatmentAction {
    fn execute(
        &self,
        context: &mut DeliveryContext,
        _event: &TreatmentEvent,
    ) -> ActionResult<TreatmentOutput> {
        if !context.completed && context.failure_reason.is_none() {
            return Err(ActionError::MissingContext {
                field: "failure_reason",
            });
        }
        context
            .check_invariants(&self.rules)
            .map_err(invariant_violation)?;

        context.finalized_at = Some(Utc::now());
        let outcome = context.outcome();

        info!(
            trip_id = %context.trip_id,
            outcome = %outcome,
            reason = ?context.failure_reason.map(FailureReason::code),
            "Delivery treatment finished"
        );

        Ok(ActionOutput::message(OutboundMessage::treatment_finished(
            context,
        )))
    }

    fn description(&self) -> &'static str {
        "Finalize treatment and report outcome"
    }
}
