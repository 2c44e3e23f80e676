use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::treatment::{ExpectedInput, TreatmentEvent, TreatmentState};

pub const DEFAULT_POSITIVE_PATTERN: &str = r"\b(yes|yep|yeah|done|completed|delivered)\b";
pub const DEFAULT_NEGATIVE_PATTERN: &str = r"\b(no|nope|not|never)\b";

static NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(\d+|zero|one|two|three|four|five|six|seven|eight|nine|ten)\b")
        .expect("number pattern is valid")
});

static DEFAULT_LEXICON: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(DEFAULT_POSITIVE_PATTERN, DEFAULT_NEGATIVE_PATTERN)
        .expect("default lexicon patterns are valid")
});

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Why an utterance could not be turned into an event for the current state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationFailure {
    #[error("utterance is empty")]
    Empty,

    #[error("utterance matches no expected answer")]
    Unrecognized,

    #[error("reason code {0} is outside 1..6")]
    OutOfRange(u64),

    #[error("utterance contains more than one number")]
    MultipleNumbers,

    #[error("voice input is not accepted in state {0}")]
    NotApplicable(TreatmentState),
}

/// Case-insensitive yes/no patterns
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: Regex,
    negative: Regex,
}

impl Lexicon {
    pub fn new(positive: &str, negative: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            positive: compile(positive)?,
            negative: compile(negative)?,
        })
    }

    /// Yes, no, or neither.
    ///
    /// When both patterns match, the answer is a no. "Delivered" is itself a positive
    /// word, so "not delivered" and "yes, but not delivered" must stay negative.
    pub fn confirm(&self, utterance: &str) -> Option<bool> {
        if self.negative.is_match(utterance) {
            Some(false)
        } else if self.positive.is_match(utterance) {
            Some(true)
        } else {
            None
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        DEFAULT_LEXICON.clone()
    }
}

/// State-aware parser from raw utterance to [`TreatmentEvent`]
#[derive(Debug, Clone, Default)]
pub struct InputClassifier {
    lexicon: Lexicon,
}

impl InputClassifier {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn classify(
        &self,
        state: TreatmentState,
        utterance: &str,
    ) -> Result<TreatmentEvent, ClassificationFailure> {
        let text = utterance.trim();

        match state.expected_input() {
            ExpectedInput::ExternalSignal | ExpectedInput::Nothing => {
                Err(ClassificationFailure::NotApplicable(state))
            }
            _ if text.is_empty() => Err(ClassificationFailure::Empty),
            ExpectedInput::YesNo => match self.lexicon.confirm(text) {
                Some(true) => Ok(TreatmentEvent::ConfirmYes),
                Some(false) => Ok(TreatmentEvent::ConfirmNo),
                None => Err(ClassificationFailure::Unrecognized),
            },
            ExpectedInput::ReasonCode => reason_code(text).map(TreatmentEvent::ReasonCode),
            ExpectedInput::FreeText => Ok(TreatmentEvent::ReasonDetailText(text.to_string())),
        }
    }
}

/// Exactly one number, digits or a spoken word, in 1..=6
fn reason_code(text: &str) -> Result<u32, ClassificationFailure> {
    let mut numbers = NUMBER_PATTERN.find_iter(text).map(|m| number_value(m.as_str()));

    let first = numbers.next().ok_or(ClassificationFailure::Unrecognized)?;
    if numbers.next().is_some() {
        return Err(ClassificationFailure::MultipleNumbers);
    }

    match u32::try_from(first) {
        Ok(code @ 1..=6) => Ok(code),
        _ => Err(ClassificationFailure::OutOfRange(first)),
    }
}

fn number_value(token: &str) -> u64 {
    match token.to_ascii_lowercase().as_str() {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => digits.parse().unwrap_or(u64::MAX),
    }
}
