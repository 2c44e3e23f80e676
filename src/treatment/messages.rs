use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::message_types;
use crate::delivery::{DeliveryContext, DeliveryOutcome};
use crate::trips::Trip;

/// Structured messages the treatment sends to the companion app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Ask the app to open the camera for the active delivery
    AskPhotoEvent {
        delivery_id: String,
        address: String,
        timestamp: DateTime<Utc>,
    },
    /// The driver's answer closed the delivery, whatever the outcome
    DeliveryConfirmed {
        delivery_id: String,
        address: String,
        timestamp: DateTime<Utc>,
    },
    /// Final report, emitted once on entering FINALIZE
    DeliveryTreatmentFinished {
        delivery_id: String,
        success: bool,
        final_state: DeliveryOutcome,
        timestamp: DateTime<Utc>,
    },
    /// The trip store marked the trip completed
    TripCompletedEvent {
        trip_id: String,
        address: String,
        client_name: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// The trip store marked the trip cancelled
    TripCancelledEvent {
        trip_id: String,
        address: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl OutboundMessage {
    pub fn ask_photo(context: &DeliveryContext) -> Self {
        Self::AskPhotoEvent {
            delivery_id: context.trip_id.clone(),
            address: context.address.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn delivery_confirmed(context: &DeliveryContext) -> Self {
        Self::DeliveryConfirmed {
            delivery_id: context.trip_id.clone(),
            address: context.address.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn trip_completed(trip: &Trip) -> Self {
        Self::TripCompletedEvent {
            trip_id: trip.id.clone(),
            address: trip.address.clone(),
            client_name: trip.client_name.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn trip_cancelled(trip: &Trip, reason: impl Into<String>) -> Self {
        Self::TripCancelledEvent {
            trip_id: trip.id.clone(),
            address: trip.address.clone(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn treatment_finished(context: &DeliveryContext) -> Self {
        let outcome = context.outcome();
        Self::DeliveryTreatmentFinished {
            delivery_id: context.trip_id.clone(),
            success: outcome.is_success(),
            final_state: outcome,
            timestamp: context.finalized_at.unwrap_or_else(Utc::now),
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::AskPhotoEvent { .. } => message_types::ASK_PHOTO_EVENT,
            Self::DeliveryConfirmed { .. } => message_types::DELIVERY_CONFIRMED,
            Self::DeliveryTreatmentFinished { .. } => message_types::DELIVERY_TREATMENT_FINISHED,
            Self::TripCompletedEvent { .. } => message_types::TRIP_COMPLETED_EVENT,
            Self::TripCancelledEvent { .. } => message_types::TRIP_CANCELLED_EVENT,
        }
    }

    /// Trip the message is about
    pub fn delivery_id(&self) -> &str {
        match self {
            Self::AskPhotoEvent { delivery_id, .. }
            | Self::DeliveryConfirmed { delivery_id, .. }
            | Self::DeliveryTreatmentFinished { delivery_id, .. } => delivery_id,
            Self::TripCompletedEvent { trip_id, .. } | Self::TripCancelledEvent { trip_id, .. } => {
                trip_id
            }
        }
    }

    /// Serialize to the JSON form sent over the data channel
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
