//! # Turn Handling
//!
//! State-aware classification of driver utterances and the controller that either
//! advances the treatment or repeats the current question.

pub mod classifier;
pub mod controller;
pub mod speech;

pub use classifier::{
    ClassificationFailure, InputClassifier, Lexicon, DEFAULT_NEGATIVE_PATTERN,
    DEFAULT_POSITIVE_PATTERN,
};
pub use controller::{SignalOutcome, TurnController, TurnOutcome};
pub use speech::{RecordingSpeech, SpeechSink};
