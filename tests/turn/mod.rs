//! Reprompting behaviour: anything the current step cannot use repeats its question
//! verbatim and changes nothing.

use std::sync::Arc;

use crate::common::{Harness, TRIP_ID};
use treatment_core::constants::prompts;
use treatment_core::treatment::{TreatmentEvent, TreatmentState};
use treatment_core::turn::{ClassificationFailure, InputClassifier, Lexicon, TurnOutcome};
use treatment_core::TreatmentError;

#[tokio::test]
async fn test_unclassifiable_answers_reprompt_verbatim() {
    let cases = [
        (TreatmentState::AskDeliveryCompletion, "maybe later", prompts::ASK_DELIVERY_COMPLETION),
        (TreatmentState::AskDeliveryCompletion, "   ", prompts::ASK_DELIVERY_COMPLETION),
        (TreatmentState::AskNonDeliveryReason, "the second reason", prompts::ASK_NON_DELIVERY_REASON),
        (TreatmentState::AskNonDeliveryReason, "2 or 3", prompts::ASK_NON_DELIVERY_REASON),
        (TreatmentState::AskNonDeliveryReason, "zero", prompts::ASK_NON_DELIVERY_REASON),
        (TreatmentState::AskReasonDetail, "", prompts::ASK_REASON_DETAIL),
        (TreatmentState::AskPhoto, "I took it", prompts::ASK_PHOTO),
    ];

    for (state, utterance, expected) in cases {
        let mut harness = Harness::with_photo_reasons(&[1]);
        harness.drive_to(state).await;
        let before = harness.machine().snapshot().await;

        let outcome = harness.controller.handle_utterance(utterance).await.unwrap();
        match outcome {
            TurnOutcome::Reprompted { prompt, cause } => {
                assert_eq!(prompt, expected, "{utterance:?} in {state}");
                assert!(cause.is_recoverable());
                assert!(matches!(cause, TreatmentError::Classification { .. }));
            }
            other => panic!("{utterance:?} in {state} should reprompt, got {other:?}"),
        }

        assert_eq!(harness.machine().snapshot().await, before);
        assert_eq!(harness.speech.spoken(), vec![expected.to_string()]);
        assert!(harness.drain().is_empty());
    }
}

#[tokio::test]
async fn test_repeated_failures_keep_repeating_the_same_text() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskNonDeliveryReason).await;

    for _ in 0..3 {
        harness.controller.handle_utterance("seven").await.unwrap();
    }
    assert_eq!(
        harness.speech.spoken(),
        vec![prompts::ASK_NON_DELIVERY_REASON.to_string(); 3]
    );
    assert_eq!(harness.machine().reprompt().await, prompts::ASK_NON_DELIVERY_REASON);
}

#[tokio::test]
async fn test_no_treatment_means_inactive() {
    let harness = Harness::with_photo_reasons(&[1]);
    assert_eq!(
        harness.controller.handle_utterance("yes").await.unwrap(),
        TurnOutcome::Inactive
    );

    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::Finalize).await;
    assert_eq!(
        harness.controller.handle_utterance("no").await.unwrap(),
        TurnOutcome::Inactive
    );
    assert!(harness.speech.spoken().is_empty());
}

#[tokio::test]
async fn test_negation_wins_over_confirmation() {
    let mut harness = Harness::with_photo_reasons(&[1]);
    harness.drive_to(TreatmentState::AskDeliveryCompletion).await;

    let outcome = harness
        .controller
        .handle_utterance("No, it is not delivered yet")
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Advanced {
            to: TreatmentState::AskNonDeliveryReason,
            ..
        }
    ));
}

#[tokio::test]
async fn test_custom_lexicon_drives_confirmation() {
    let harness = Harness::with_photo_reasons(&[1]);
    let lexicon = Lexicon::new(r"\b(oui|si)\b", r"\b(non)\b").unwrap();
    let controller = treatment_core::turn::TurnController::new(
        Arc::clone(harness.machine()),
        InputClassifier::new(lexicon),
        harness.speech.clone(),
    );

    controller.start(TRIP_ID, "").await.unwrap();
    let outcome = controller.handle_utterance("Oui").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Advanced {
            to: TreatmentState::Finalize,
            ..
        }
    ));
}

#[test]
fn test_classifier_maps_spoken_numbers() {
    let classifier = InputClassifier::default();
    let state = TreatmentState::AskNonDeliveryReason;

    for (utterance, code) in [("one", 1), ("reason FIVE please", 5), ("6", 6), ("it's 2", 2)] {
        assert_eq!(
            classifier.classify(state, utterance),
            Ok(TreatmentEvent::ReasonCode(code))
        );
    }
    assert_eq!(
        classifier.classify(state, "99999999999999999999999"),
        Err(ClassificationFailure::OutOfRange(u64::MAX))
    );
    assert_eq!(
        classifier.classify(state, "nothing fits"),
        Err(ClassificationFailure::Unrecognized)
    );
}
