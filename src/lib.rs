#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Treatment Core
//!
//! Deterministic delivery-confirmation workflow for a voice assistant.
//!
//! ## Overview
//!
//! Once a driver arrives at a destination, every utterance is interpreted strictly against
//! the current step of a small state machine. Answers that do not fit the expected shape
//! (yes/no, a reason number from 1 to 6, free text, or the app's photo signal) make the
//! same question repeat word for word instead of letting a generative model improvise.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Generic guarded FSM engine with serialized transitions
//! - [`delivery`] - Failure reasons, delivery rules and the workflow context
//! - [`treatment`] - The delivery treatment states, events, guards, actions and machine
//! - [`turn`] - Input classification and the reprompting turn controller
//! - [`session`] - Data-channel message contract and per-driver voice session
//! - [`trips`] - Trip model, repository and update bus
//! - [`events`] - Outbound message publishing
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use treatment_core::config::TreatmentConfig;
//! use treatment_core::events::BroadcastPublisher;
//! use treatment_core::session::VoiceSession;
//! use treatment_core::trips::{InMemoryTripRepository, TripUpdateBus};
//! use treatment_core::turn::RecordingSpeech;
//!
//! # async fn example() -> treatment_core::TreatmentResult<()> {
//! let config = TreatmentConfig::load()?;
//! let session = VoiceSession::new(
//!     &config,
//!     Arc::new(BroadcastPublisher::new(config.messaging.channel_capacity)),
//!     Arc::new(RecordingSpeech::new()),
//!     Arc::new(InMemoryTripRepository::new()),
//!     TripUpdateBus::new(config.messaging.channel_capacity),
//! )?;
//!
//! session
//!     .handle_data_message(r#"{"type":"arrived","trip_id":"trip-1","address":"1 Main St"}"#)
//!     .await?;
//! session.handle_user_turn("yes").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod delivery;
pub mod error;
pub mod events;
pub mod logging;
pub mod session;
pub mod state_machine;
pub mod treatment;
pub mod trips;
pub mod turn;

pub use config::TreatmentConfig;
pub use delivery::{DeliveryContext, DeliveryOutcome, DeliveryRules, FailureReason};
pub use error::{TreatmentError, TreatmentResult};
pub use events::{BroadcastPublisher, MessagePublisher};
pub use session::{AgentMode, VoiceSession};
pub use treatment::{DeliveryTreatmentMachine, OutboundMessage, TreatmentEvent, TreatmentState};
pub use turn::{InputClassifier, TurnController};
