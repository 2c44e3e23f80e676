use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::TreatmentResult;

use super::model::Trip;

/// Publish/subscribe channel for trip updates coming from the app.
///
/// Delivery is at-most-once per subscriber: updates published before a subscriber
/// joined are not replayed, and a subscriber that falls more than `capacity` updates
/// behind loses the oldest ones.
#[derive(Debug, Clone)]
pub struct TripUpdateBus {
    sender: broadcast::Sender<Trip>,
}

impl TripUpdateBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an update and return how many subscribers it reached
    pub fn publish(&self, trip: Trip) -> usize {
        let trip_id = trip.id.clone();
        match self.sender.send(trip) {
            Ok(receivers) => {
                debug!(trip_id = %trip_id, receivers, "Trip update published");
                receivers
            }
            Err(_) => {
                warn!(trip_id = %trip_id, "Trip update dropped, no subscribers");
                0
            }
        }
    }

    /// Parse a `trip_update` payload and publish it
    pub fn publish_json(&self, data: serde_json::Value) -> TreatmentResult<Trip> {
        let trip: Trip = serde_json::from_value(data)?;
        self.publish(trip.clone());
        Ok(trip)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Trip> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TripUpdateBus {
    fn default() -> Self {
        Self::new(64)
    }
}
