//! Property tests over arbitrary utterances, states and trip identifiers

use proptest::prelude::*;
use tokio_test::block_on;

use crate::common::{address_strategy, trip_id_strategy, treatment_state_strategy, utterance_strategy, Harness};
use treatment_core::constants::prompts;
use treatment_core::treatment::{TreatmentEvent, TreatmentState};
use treatment_core::turn::InputClassifier;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_classified_reason_codes_stay_in_range(utterance in utterance_strategy()) {
        let classifier = InputClassifier::default();
        if let Ok(event) = classifier.classify(TreatmentState::AskNonDeliveryReason, &utterance) {
            match event {
                TreatmentEvent::ReasonCode(code) => prop_assert!((1..=6).contains(&code)),
                other => prop_assert!(false, "unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn prop_voice_never_answers_photo_or_idle(
        utterance in utterance_strategy(),
        state in prop::sample::select(vec![
            TreatmentState::Idle,
            TreatmentState::AskPhoto,
            TreatmentState::Finalize,
        ]),
    ) {
        prop_assert!(InputClassifier::default().classify(state, &utterance).is_err());
    }

    #[test]
    fn prop_reprompt_is_side_effect_free(state in treatment_state_strategy()) {
        block_on(async {
            let mut harness = Harness::with_photo_reasons(&[1]);
            harness.drive_to(state).await;
            let before = harness.machine().snapshot().await;

            let first = harness.machine().reprompt().await;
            let second = harness.machine().reprompt().await;

            assert_eq!(first, second);
            assert_eq!(first, before.prompt);
            assert_eq!(harness.machine().snapshot().await, before);
            assert!(harness.drain().is_empty());
        });
    }

    #[test]
    fn prop_any_utterance_keeps_machine_consistent(
        state in treatment_state_strategy(),
        utterance in utterance_strategy(),
    ) {
        block_on(async {
            let mut harness = Harness::with_photo_reasons(&[1]);
            harness.drive_to(state).await;
            let before = harness.machine().snapshot().await;

            let _ = harness.controller.handle_utterance(&utterance).await.unwrap();

            let after = harness.machine().snapshot().await;
            if after.state == before.state {
                assert_eq!(after, before);
            }
            assert_eq!(after.context.trip_id, before.context.trip_id);
        });
    }

    #[test]
    fn prop_start_treatment_is_always_fresh(
        state in treatment_state_strategy(),
        trip_id in trip_id_strategy(),
        address in address_strategy(),
    ) {
        block_on(async {
            let mut harness = Harness::with_photo_reasons(&[1]);
            harness.drive_to(state).await;

            let prompt = harness
                .machine()
                .start_treatment(trip_id.clone(), address.clone())
                .await
                .unwrap();
            assert_eq!(prompt, prompts::ASK_DELIVERY_COMPLETION);

            let snapshot = harness.machine().snapshot().await;
            assert_eq!(snapshot.state, TreatmentState::AskDeliveryCompletion);
            assert_eq!(snapshot.context.trip_id, trip_id);
            assert_eq!(snapshot.context.address, address);
            assert!(!snapshot.context.completed);
            assert!(snapshot.context.failure_reason.is_none());
            assert!(snapshot.context.photo.is_none());
        });
    }
}
