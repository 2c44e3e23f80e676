use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state_machine::WorkflowEvent;

/// Classified inputs that can trigger treatment transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TreatmentEvent {
    /// Begin a treatment for the trip already placed in the context
    StartTreatment,
    ConfirmYes,
    ConfirmNo,
    /// Numbered non-delivery reason; only 1..=6 can match a transition
    ReasonCode(u32),
    ReasonDetailText(String),
    /// App reported a photo for the given trip id
    PhotoTaken(String),
    /// App reported the photo was not taken for the given trip id
    PhotoNotTaken(String),
}

/// Payload-free tag used to key the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreatmentEventKind {
    StartTreatment,
    ConfirmYes,
    ConfirmNo,
    ReasonCode,
    ReasonDetailText,
    PhotoTaken,
    PhotoNotTaken,
}

impl TreatmentEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Trip id carried by an external photo signal
    pub fn signal_trip_id(&self) -> Option<&str> {
        match self {
            Self::PhotoTaken(trip_id) | Self::PhotoNotTaken(trip_id) => Some(trip_id),
            _ => None,
        }
    }

    /// Create a photo signal event
    pub fn photo_signal(trip_id: impl Into<String>, taken: bool) -> Self {
        if taken {
            Self::PhotoTaken(trip_id.into())
        } else {
            Self::PhotoNotTaken(trip_id.into())
        }
    }
}

impl TreatmentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartTreatment => "start_treatment",
            Self::ConfirmYes => "confirm_yes",
            Self::ConfirmNo => "confirm_no",
            Self::ReasonCode => "reason_code",
            Self::ReasonDetailText => "reason_detail_text",
            Self::PhotoTaken => "photo_taken",
            Self::PhotoNotTaken => "photo_not_taken",
        }
    }
}

impl fmt::Display for TreatmentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WorkflowEvent for TreatmentEvent {
    type Kind = TreatmentEventKind;

    fn kind(&self) -> TreatmentEventKind {
        match self {
            Self::StartTreatment => TreatmentEventKind::StartTreatment,
            Self::ConfirmYes => TreatmentEventKind::ConfirmYes,
            Self::ConfirmNo => TreatmentEventKind::ConfirmNo,
            Self::ReasonCode(_) => TreatmentEventKind::ReasonCode,
            Self::ReasonDetailText(_) => TreatmentEventKind::ReasonDetailText,
            Self::PhotoTaken(_) => TreatmentEventKind::PhotoTaken,
            Self::PhotoNotTaken(_) => TreatmentEventKind::PhotoNotTaken,
        }
    }
}
