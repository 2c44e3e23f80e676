use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::TreatmentResult;

use super::bus::TripUpdateBus;
use super::model::{Trip, TripState};

/// Trip store as seen by a voice session
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn get(&self, trip_id: &str) -> TreatmentResult<Option<Trip>>;

    async fn upsert(&self, trip: Trip) -> TreatmentResult<()>;

    /// Mark a trip delivered. Returns false when the trip is unknown.
    async fn mark_completed(&self, trip_id: &str) -> TreatmentResult<bool>;

    /// Mark a trip not delivered, recording why. Returns false when the trip is unknown.
    async fn mark_cancelled(&self, trip_id: &str, reason: &str) -> TreatmentResult<bool>;
}

/// Per-state trip counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TripStats {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Process-local trip store, cheap to clone and share
#[derive(Debug, Clone, Default)]
pub struct InMemoryTripRepository {
    trips: Arc<DashMap<String, Trip>>,
}

impl InMemoryTripRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Trip> {
        self.trips.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn by_state(&self, state: TripState) -> Vec<Trip> {
        self.trips
            .iter()
            .filter(|entry| entry.state == state)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn remove(&self, trip_id: &str) -> Option<Trip> {
        self.trips.remove(trip_id).map(|(_, trip)| trip)
    }

    pub fn count(&self) -> usize {
        self.trips.len()
    }

    pub fn clear(&self) {
        let count = self.trips.len();
        self.trips.clear();
        info!(count, "Trip store cleared");
    }

    pub fn stats(&self) -> TripStats {
        self.trips
            .iter()
            .fold(TripStats::default(), |mut stats, entry| {
                stats.total += 1;
                match entry.state {
                    TripState::NotStarted => stats.not_started += 1,
                    TripState::InProgress => stats.in_progress += 1,
                    TripState::Completed => stats.completed += 1,
                    TripState::Cancelled => stats.cancelled += 1,
                }
                stats
            })
    }

    /// Apply every update published on `bus` until the bus is dropped
    pub fn follow(&self, bus: &TripUpdateBus) -> JoinHandle<()> {
        let trips = Arc::clone(&self.trips);
        let mut updates = bus.subscribe();

        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(trip) => {
                        debug!(trip_id = %trip.id, state = %trip.state, "Trip updated");
                        trips.insert(trip.id.clone(), trip);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Trip store lagging behind updates");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn set_state(&self, trip_id: &str, state: TripState, reason: Option<&str>) -> bool {
        match self.trips.get_mut(trip_id) {
            Some(mut trip) => {
                trip.state = state;
                trip.failure_reason = reason.map(str::to_string);
                info!(trip_id, state = %state, reason, "Trip closed");
                true
            }
            None => {
                warn!(trip_id, state = %state, "Cannot close unknown trip");
                false
            }
        }
    }
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn get(&self, trip_id: &str) -> TreatmentResult<Option<Trip>> {
        Ok(self.trips.get(trip_id).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, trip: Trip) -> TreatmentResult<()> {
        self.trips.insert(trip.id.clone(), trip);
        Ok(())
    }

    async fn mark_completed(&self, trip_id: &str) -> TreatmentResult<bool> {
        Ok(self.set_state(trip_id, TripState::Completed, None))
    }

    async fn mark_cancelled(&self, trip_id: &str, reason: &str) -> TreatmentResult<bool> {
        Ok(self.set_state(trip_id, TripState::Cancelled, Some(reason)))
    }
}
