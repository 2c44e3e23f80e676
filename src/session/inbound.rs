use serde::Deserialize;

use crate::error::TreatmentResult;

/// Arrival at a destination. The app has sent the trip id under several names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Arrival {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    trip_id: Option<String>,
    #[serde(default)]
    delivery_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Arrival {
    /// First non-empty of `id`, `trip_id`, `delivery_id`
    pub fn trip_id(&self) -> Option<&str> {
        [&self.id, &self.trip_id, &self.delivery_id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|id| !id.is_empty())
    }

    /// Address when one was sent and is not blank
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref().filter(|address| !address.trim().is_empty())
    }
}

/// Photo outcome reported by the app
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PhotoSignal {
    #[serde(default)]
    pub trip_id: Option<String>,
    /// Idempotency key; a repeated id is applied at most once per treatment
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Messages received from the app over the data channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    #[serde(alias = "arrived")]
    DestinationArrival(Arrival),
    PhotoTaken(PhotoSignal),
    PhotoNotTaken(PhotoSignal),
    TripUpdate {
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Any other type; left for other collaborators
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn parse(raw: &str) -> TreatmentResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
