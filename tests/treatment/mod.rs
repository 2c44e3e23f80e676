//! End-to-end treatment flows through the turn controller, including concurrent signals

use std::sync::Arc;

use crate::common::{Harness, ADDRESS, TRIP_ID};
use treatment_core::constants::prompts;
use treatment_core::delivery::{DeliveryContext, DeliveryOutcome, FailureReason, PhotoOutcome};
use treatment_core::state_machine::errors::invariant_violation;
use treatment_core::state_machine::{
    ActionOutput, ActionResult, StateAction, Transition, TransitionTable,
};
use treatment_core::treatment::actions::AskCompletionAction;
use treatment_core::treatment::{
    OutboundMessage, TreatmentEvent, TreatmentEventKind, TreatmentState, TreatmentTable,
};
use treatment_core::turn::{SignalOutcome, TurnOutcome};
use treatment_core::TreatmentError;

/// Action that always reports a corrupted context
struct CorruptContextAction;

impl StateAction<DeliveryContext, TreatmentEvent, OutboundMessage> for CorruptContextAction {
    fn execute(
        &self,
        _context: &mut DeliveryContext,
        _event: &TreatmentEvent,
    ) -> ActionResult<ActionOutput<OutboundMessage>> {
        Err(invariant_violation("photo recorded without a reason"))
    }

    fn description(&self) -> &'static str {
        "Corrupt the context"
    }
}

/// Table whose closing rows always fail
fn corrupting_table() -> TreatmentTable {
    type Row = Transition<TreatmentState, TreatmentEvent, DeliveryContext, OutboundMessage>;
    use TreatmentEventKind as Ev;
    use TreatmentState as St;

    TransitionTable::builder()
        .transition(
            Row::new(St::Idle, Ev::StartTreatment, St::AskDeliveryCompletion)
                .with_action(AskCompletionAction),
        )
        .transition(
            Row::new(St::AskDeliveryCompletion, Ev::ConfirmYes, St::Finalize)
                .with_action(CorruptContextAction),
        )
        .transition(Row::new(St::AskDeliveryCompletion, Ev::ConfirmNo, St::AskPhoto))
        .transition(
            Row::new(St::AskPhoto, Ev::PhotoTaken, St::Finalize).with_action(CorruptContextAction),
        )
        .build()
        .unwrap()
}

fn finished(messages: &[OutboundMessage]) -> Option<(bool, DeliveryOutcome)> {
    messages.iter().find_map(|message| match message {
        OutboundMessage::DeliveryTreatmentFinished {
            success,
            final_state,
            ..
        } => Some((*success, *final_state)),
        _ => None,
    })
}

#[tokio::test]
async fn test_confirmed_delivery_finishes_successfully() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();

    let outcome = harness.controller.handle_utterance("yes").await.unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            from: TreatmentState::AskDeliveryCompletion,
            to: TreatmentState::Finalize,
            prompt: prompts::DELIVERY_CONFIRMED.to_string(),
        }
    );

    let messages = harness.drain();
    let types: Vec<_> = messages.iter().map(OutboundMessage::message_type).collect();
    assert_eq!(types, vec!["delivery_confirmed", "delivery_treatment_finished"]);
    assert!(messages.iter().all(|message| message.delivery_id() == TRIP_ID));
    assert_eq!(finished(&messages), Some((true, DeliveryOutcome::Completed)));
    assert_eq!(
        harness.speech.spoken(),
        vec![
            prompts::ASK_DELIVERY_COMPLETION.to_string(),
            prompts::DELIVERY_CONFIRMED.to_string()
        ]
    );
}

#[tokio::test]
async fn test_photo_reason_asks_app_then_finishes_on_signal() {
    let mut harness = Harness::with_photo_reasons(&[1, 3]);
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();

    harness.controller.handle_utterance("no").await.unwrap();
    let outcome = harness.controller.handle_utterance("3").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Advanced {
            to: TreatmentState::AskPhoto,
            ..
        }
    ));

    let messages = harness.drain();
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        OutboundMessage::AskPhotoEvent {
            delivery_id,
            address,
            ..
        } => {
            assert_eq!(delivery_id, TRIP_ID);
            assert_eq!(address, ADDRESS);
        }
        other => panic!("expected ask_photo_event, got {other:?}"),
    }

    let signal = harness
        .controller
        .handle_photo_signal(TRIP_ID, true, None)
        .await
        .unwrap();
    assert_eq!(
        signal,
        SignalOutcome::Applied {
            to: TreatmentState::Finalize
        }
    );

    let context = harness.machine().context().await;
    assert_eq!(context.failure_reason, Some(FailureReason::AccessDenied));
    assert_eq!(context.photo, Some(PhotoOutcome::Taken));
    assert_eq!(
        finished(&harness.drain()),
        Some((true, DeliveryOutcome::CompletedWithPhoto))
    );
    assert_eq!(
        harness.speech.last().as_deref(),
        Some(prompts::DELIVERY_CONFIRMED_WITH_PHOTO)
    );
}

#[tokio::test]
async fn test_empty_detail_repeats_detail_question() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskReasonDetail).await;

    let outcome = harness.controller.handle_utterance("").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Reprompted { ref prompt, .. } if prompt == prompts::ASK_REASON_DETAIL
    ));
    assert_eq!(harness.machine().state().await, TreatmentState::AskReasonDetail);
    assert_eq!(harness.speech.spoken(), vec![prompts::ASK_REASON_DETAIL.to_string()]);
}

#[tokio::test]
async fn test_out_of_range_reason_repeats_reason_list() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskNonDeliveryReason).await;
    let before = harness.machine().snapshot().await;

    let outcome = harness.controller.handle_utterance("9").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Reprompted { ref prompt, .. } if prompt == prompts::ASK_NON_DELIVERY_REASON
    ));
    assert_eq!(harness.machine().snapshot().await, before);
    assert!(harness.drain().is_empty());
}

#[tokio::test]
async fn test_other_reason_always_asks_for_detail() {
    // Even when "other" needs a photo, the detail comes first
    let mut harness = Harness::with_photo_reasons(&[6]);
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();
    harness.controller.handle_utterance("no").await.unwrap();

    let outcome = harness.controller.handle_utterance("six").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Advanced {
            to: TreatmentState::AskReasonDetail,
            ..
        }
    ));
    assert!(harness.drain().is_empty());

    let outcome = harness
        .controller
        .handle_utterance("  the dog would not let me in  ")
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Advanced {
            to: TreatmentState::AskPhoto,
            ..
        }
    ));
    assert_eq!(
        harness.machine().context().await.detail.as_deref(),
        Some("the dog would not let me in")
    );
    assert_eq!(harness.drain().len(), 1);
}

#[tokio::test]
async fn test_reason_without_photo_rule_never_asks_for_photo() {
    let mut harness = Harness::with_photo_reasons(&[]);
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();
    harness.controller.handle_utterance("no").await.unwrap();

    let outcome = harness.controller.handle_utterance("1").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Advanced {
            to: TreatmentState::Finalize,
            ..
        }
    ));

    let messages = harness.drain();
    assert!(messages
        .iter()
        .all(|message| !matches!(message, OutboundMessage::AskPhotoEvent { .. })));
    assert_eq!(finished(&messages), Some((false, DeliveryOutcome::Failed)));
    assert_eq!(
        harness.speech.last().as_deref(),
        Some(prompts::DELIVERY_NOT_COMPLETED)
    );
}

#[tokio::test]
async fn test_photo_not_taken_fails_the_delivery() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskPhoto).await;

    harness
        .controller
        .handle_photo_signal(TRIP_ID, false, Some("evt-1"))
        .await
        .unwrap();
    assert_eq!(
        finished(&harness.drain()),
        Some((false, DeliveryOutcome::Failed))
    );
}

#[tokio::test]
async fn test_start_treatment_restarts_from_any_state() {
    for state in crate::common::ALL_STATES {
        let mut harness = Harness::with_photo_reasons(&[1]);
        harness.drive_to(state).await;

        let prompt = harness.controller.start("trip-2", "2 Oak Ave").await.unwrap();
        assert_eq!(prompt, prompts::ASK_DELIVERY_COMPLETION);

        let snapshot = harness.machine().snapshot().await;
        assert_eq!(snapshot.state, TreatmentState::AskDeliveryCompletion);
        assert_eq!(snapshot.context.trip_id, "trip-2");
        assert_eq!(snapshot.context.address, "2 Oak Ave");
        assert!(!snapshot.context.completed);
        assert_eq!(snapshot.context.failure_reason, None);
        assert_eq!(snapshot.context.detail, None);
        assert_eq!(snapshot.context.photo, None);
    }
}

#[tokio::test]
async fn test_signal_for_previous_trip_is_stale_after_restart() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskPhoto).await;

    harness.controller.start("trip-2", "2 Oak Ave").await.unwrap();
    harness.controller.handle_utterance("no").await.unwrap();
    harness.controller.handle_utterance("1").await.unwrap();

    let outcome = harness
        .controller
        .handle_photo_signal(TRIP_ID, true, None)
        .await
        .unwrap();
    assert!(matches!(outcome, SignalOutcome::Stale { .. }));
    assert_eq!(harness.machine().state().await, TreatmentState::AskPhoto);
    assert_eq!(harness.machine().context().await.trip_id, "trip-2");
}

#[tokio::test]
async fn test_racing_photo_signals_apply_once() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskPhoto).await;

    let Harness {
        controller,
        mut outbound,
        ..
    } = harness;
    let controller = Arc::new(controller);
    let mut handles = Vec::new();
    for n in 0..8 {
        let controller = Arc::clone(&controller);
        handles.push(tokio::spawn(async move {
            let event_id = format!("evt-{}", n % 2);
            controller
                .handle_photo_signal(TRIP_ID, n % 3 != 0, Some(&event_id))
                .await
                .unwrap()
        }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            SignalOutcome::Applied { to } => {
                assert_eq!(to, TreatmentState::Finalize);
                applied += 1;
            }
            SignalOutcome::Stale { .. } | SignalOutcome::Duplicate => {}
            SignalOutcome::Restarted { cause } => panic!("unexpected restart: {cause}"),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(controller.machine().state().await, TreatmentState::Finalize);

    let mut finished_count = 0;
    while let Ok(published) = outbound.try_recv() {
        if matches!(
            published.message,
            OutboundMessage::DeliveryTreatmentFinished { .. }
        ) {
            finished_count += 1;
        }
    }
    assert_eq!(finished_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_voice_turn_and_signal_race_without_corruption() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskPhoto).await;

    let controller = Arc::new(harness.controller);
    let voice = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.handle_utterance("yes").await.unwrap() })
    };
    let signal = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .handle_photo_signal(TRIP_ID, true, None)
                .await
                .unwrap()
        })
    };

    let voice = voice.await.unwrap();
    let signal = signal.await.unwrap();

    // Voice input never advances the photo step
    assert!(!matches!(voice, TurnOutcome::Advanced { .. }));
    assert_eq!(
        signal,
        SignalOutcome::Applied {
            to: TreatmentState::Finalize
        }
    );

    let snapshot = controller.machine().snapshot().await;
    assert_eq!(snapshot.state, TreatmentState::Finalize);
    assert_eq!(snapshot.context.photo, Some(PhotoOutcome::Taken));
    assert_eq!(snapshot.context.failure_reason, Some(FailureReason::RecipientAbsent));
}

#[tokio::test]
async fn test_failed_action_restarts_same_trip() {
    let mut harness = Harness::with_table(corrupting_table());
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();

    let err = harness
        .machine()
        .submit(&TreatmentEvent::ConfirmYes)
        .await
        .unwrap_err();
    assert!(matches!(err, TreatmentError::ContextInvariantViolation(_)));

    let snapshot = harness.machine().snapshot().await;
    assert_eq!(snapshot.state, TreatmentState::AskDeliveryCompletion);
    assert_eq!(snapshot.context.trip_id, TRIP_ID);
    assert_eq!(snapshot.context.address, ADDRESS);
    assert!(!snapshot.context.completed);
    assert_eq!(snapshot.prompt, prompts::ASK_DELIVERY_COMPLETION);
    assert!(harness.drain().is_empty());
}

#[tokio::test]
async fn test_failed_action_during_turn_repeats_first_question() {
    let harness = Harness::with_table(corrupting_table());
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();
    harness.speech.clear();

    let outcome = harness.controller.handle_utterance("yes").await.unwrap();
    match outcome {
        TurnOutcome::Reprompted { prompt, cause } => {
            assert_eq!(prompt, prompts::ASK_DELIVERY_COMPLETION);
            assert!(matches!(cause, TreatmentError::ContextInvariantViolation(_)));
        }
        other => panic!("expected a reprompt, got {other:?}"),
    }
    assert_eq!(
        harness.speech.spoken(),
        vec![prompts::ASK_DELIVERY_COMPLETION.to_string()]
    );
    assert_eq!(
        harness.machine().state().await,
        TreatmentState::AskDeliveryCompletion
    );
}

#[tokio::test]
async fn test_failed_action_on_signal_reports_restart() {
    let harness = Harness::with_table(corrupting_table());
    harness.controller.start(TRIP_ID, ADDRESS).await.unwrap();
    harness.controller.handle_utterance("no").await.unwrap();
    assert_eq!(harness.machine().state().await, TreatmentState::AskPhoto);

    let outcome = harness
        .controller
        .handle_photo_signal(TRIP_ID, true, Some("evt-1"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        SignalOutcome::Restarted {
            cause: TreatmentError::ContextInvariantViolation(_)
        }
    ));

    let snapshot = harness.machine().snapshot().await;
    assert_eq!(snapshot.state, TreatmentState::AskDeliveryCompletion);
    assert_eq!(snapshot.context.trip_id, TRIP_ID);
    assert_eq!(snapshot.context.address, ADDRESS);
    assert_eq!(
        harness.speech.last().as_deref(),
        Some(prompts::ASK_DELIVERY_COMPLETION)
    );
}
