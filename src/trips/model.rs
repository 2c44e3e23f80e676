use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a trip as tracked by the companion app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TripState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for TripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "notStarted"),
            Self::InProgress => write!(f, "inProgress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Coordinates plus their human-readable address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "LocationPayload")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Accepted location shapes: the app's flat form or a geocoder result
#[derive(Deserialize)]
#[serde(untagged)]
enum LocationPayload {
    Geocoded {
        geometry: Geometry,
        #[serde(default)]
        formatted_address: String,
    },
    Flat {
        #[serde(default)]
        latitude: f64,
        #[serde(default)]
        longitude: f64,
        #[serde(default)]
        address: String,
    },
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    location: LatLng,
}

#[derive(Deserialize, Default)]
struct LatLng {
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lng: f64,
}

impl From<LocationPayload> for Location {
    fn from(payload: LocationPayload) -> Self {
        match payload {
            LocationPayload::Geocoded {
                geometry,
                formatted_address,
            } => Self {
                latitude: geometry.location.lat,
                longitude: geometry.location.lng,
                address: formatted_address,
            },
            LocationPayload::Flat {
                latitude,
                longitude,
                address,
            } => Self {
                latitude,
                longitude,
                address,
            },
        }
    }
}

/// Delivery record owned by the trip store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub state: TripState,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub package_info: Option<String>,
    /// Set when a treatment closes the trip as not delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Trip {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            id: id.into(),
            location: Location {
                address: address.clone(),
                ..Location::default()
            },
            address,
            state: TripState::NotStarted,
            client_name: None,
            package_info: None,
            failure_reason: None,
        }
    }

    pub fn with_state(mut self, state: TripState) -> Self {
        self.state = state;
        self
    }
}
