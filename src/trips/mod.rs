//! # Trips
//!
//! Trip records owned outside the treatment workflow: the data model received from the
//! app, an explicit repository passed to each session, and the update bus.

pub mod bus;
pub mod model;
pub mod repository;

pub use bus::TripUpdateBus;
pub use model::{Location, Trip, TripState};
pub use repository::{InMemoryTripRepository, TripRepository, TripStats};
