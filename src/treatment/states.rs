use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery treatment state definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentState {
    /// No treatment started yet
    Idle,
    /// Asked whether the delivery was completed
    AskDeliveryCompletion,
    /// Asked for a numbered non-delivery reason
    AskNonDeliveryReason,
    /// Asked for a free-text description of "other"
    AskReasonDetail,
    /// Waiting for the app to report the photo outcome
    AskPhoto,
    /// Treatment finished; terminal until the next start
    Finalize,
}

/// What kind of answer a state is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedInput {
    YesNo,
    ReasonCode,
    FreeText,
    /// Only the app's photo signal advances this state
    ExternalSignal,
    Nothing,
}

impl TreatmentState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalize)
    }

    /// Check if a treatment is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Finalize)
    }

    pub fn expected_input(&self) -> ExpectedInput {
        match self {
            Self::AskDeliveryCompletion => ExpectedInput::YesNo,
            Self::AskNonDeliveryReason => ExpectedInput::ReasonCode,
            Self::AskReasonDetail => ExpectedInput::FreeText,
            Self::AskPhoto => ExpectedInput::ExternalSignal,
            Self::Idle | Self::Finalize => ExpectedInput::Nothing,
        }
    }
}

impl fmt::Display for TreatmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AskDeliveryCompletion => write!(f, "ask_delivery_completion"),
            Self::AskNonDeliveryReason => write!(f, "ask_non_delivery_reason"),
            Self::AskReasonDetail => write!(f, "ask_reason_detail"),
            Self::AskPhoto => write!(f, "ask_photo"),
            Self::Finalize => write!(f, "finalize"),
        }
    }
}

impl std::str::FromStr for TreatmentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "ask_delivery_completion" => Ok(Self::AskDeliveryCompletion),
            "ask_non_delivery_reason" => Ok(Self::AskNonDeliveryReason),
            "ask_reason_detail" => Ok(Self::AskReasonDetail),
            "ask_photo" => Ok(Self::AskPhoto),
            "finalize" => Ok(Self::Finalize),
            _ => Err(format!("Invalid treatment state: {s}")),
        }
    }
}

impl Default for TreatmentState {
    fn default() -> Self {
        Self::Idle
    }
}
