use proptest::prelude::*;
use treatment_core::treatment::TreatmentState;

use super::harness::ALL_STATES;

/// Strategy for picking any treatment state
pub fn treatment_state_strategy() -> impl Strategy<Value = TreatmentState> {
    prop::sample::select(ALL_STATES.to_vec())
}

/// Strategy for free-form utterances, mixing plain text with answer-like words and numbers
pub fn utterance_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,!?']{0,40}",
        Just(String::new()),
        Just("yes".to_string()),
        Just("no".to_string()),
        Just("not delivered".to_string()),
        (0u64..1000).prop_map(|n| n.to_string()),
        (0u64..20, 0u64..20).prop_map(|(a, b)| format!("{a} or {b}")),
        prop::sample::select(vec!["one", "six", "seven", "ten", "zero"]).prop_map(str::to_string),
    ]
}

/// Strategy for trip identifiers
pub fn trip_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9-]{0,16}"
}

/// Strategy for addresses
pub fn address_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.]{0,40}"
}
