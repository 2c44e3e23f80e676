//! # Voice Session
//!
//! Routes one driver's traffic: utterances go to the treatment while one is running and
//! to the free-form assistant otherwise; data-channel messages start treatments, deliver
//! photo signals and forward trip updates.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TreatmentConfig;
use crate::error::{TreatmentError, TreatmentResult};
use crate::events::MessagePublisher;
use crate::logging::log_treatment_operation;
use crate::treatment::{DeliveryTreatmentMachine, OutboundMessage, TreatmentState};
use crate::trips::{TripRepository, TripUpdateBus};
use crate::turn::{SignalOutcome, SpeechSink, TurnController, TurnOutcome};

use super::inbound::{Arrival, InboundMessage, PhotoSignal};

/// Who answers the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Free-form assistant
    Normal,
    /// Scripted delivery treatment
    DeliveryTreatment,
}

/// What happened to one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDisposition {
    /// Not ours; hand it to the conversational assistant
    Delegated,
    Workflow(TurnOutcome),
}

/// What happened to one data-channel message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageDisposition {
    TreatmentStarted { trip_id: String, prompt: String },
    Signal(SignalOutcome),
    TripUpdated { trip_id: String },
    Ignored { reason: String },
}

#[derive(Debug)]
struct SessionState {
    mode: AgentMode,
    current_trip: Option<String>,
}

pub struct VoiceSession {
    id: Uuid,
    controller: TurnController,
    publisher: Arc<dyn MessagePublisher>,
    trips: Arc<dyn TripRepository>,
    updates: TripUpdateBus,
    state: Mutex<SessionState>,
}

impl VoiceSession {
    pub fn new(
        config: &TreatmentConfig,
        publisher: Arc<dyn MessagePublisher>,
        speech: Arc<dyn SpeechSink>,
        trips: Arc<dyn TripRepository>,
        updates: TripUpdateBus,
    ) -> TreatmentResult<Self> {
        let machine = DeliveryTreatmentMachine::new(config.delivery_rules()?, Arc::clone(&publisher))?;
        let controller = TurnController::new(Arc::new(machine), config.classifier()?, speech);
        Ok(Self::from_parts(controller, publisher, trips, updates))
    }

    pub fn from_parts(
        controller: TurnController,
        publisher: Arc<dyn MessagePublisher>,
        trips: Arc<dyn TripRepository>,
        updates: TripUpdateBus,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, "Voice session created");

        Self {
            id,
            controller,
            publisher,
            trips,
            updates,
            state: Mutex::new(SessionState {
                mode: AgentMode::Normal,
                current_trip: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> AgentMode {
        self.state.lock().mode
    }

    pub fn current_trip(&self) -> Option<String> {
        self.state.lock().current_trip.clone()
    }

    pub fn machine(&self) -> &Arc<DeliveryTreatmentMachine> {
        self.controller.machine()
    }

    /// Handle one completed user turn
    pub async fn handle_user_turn(&self, utterance: &str) -> TreatmentResult<TurnDisposition> {
        if self.mode() == AgentMode::Normal {
            return Ok(TurnDisposition::Delegated);
        }

        let outcome = self.controller.handle_utterance(utterance).await?;
        if outcome == TurnOutcome::Inactive {
            self.state.lock().mode = AgentMode::Normal;
            return Ok(TurnDisposition::Delegated);
        }

        self.close_if_finished().await?;
        Ok(TurnDisposition::Workflow(outcome))
    }

    /// Handle one raw data-channel message. Malformed payloads are logged and ignored.
    pub async fn handle_data_message(&self, raw: &str) -> TreatmentResult<MessageDisposition> {
        let message = match InboundMessage::parse(raw) {
            Ok(message) => message,
            Err(err) => return Ok(self.ignore_malformed(err)),
        };

        match message {
            InboundMessage::DestinationArrival(arrival) => self.on_arrival(arrival).await,
            InboundMessage::PhotoTaken(signal) => self.on_photo(signal, true).await,
            InboundMessage::PhotoNotTaken(signal) => self.on_photo(signal, false).await,
            InboundMessage::TripUpdate { data } => match self.updates.publish_json(data) {
                Ok(trip) => Ok(MessageDisposition::TripUpdated { trip_id: trip.id }),
                Err(err) => Ok(self.ignore_malformed(err)),
            },
            InboundMessage::Unknown => {
                debug!(session_id = %self.id, "Ignoring unknown message type");
                Ok(MessageDisposition::Ignored {
                    reason: "unknown message type".to_string(),
                })
            }
        }
    }

    fn ignore_malformed(&self, err: TreatmentError) -> MessageDisposition {
        warn!(session_id = %self.id, error = %err, "Ignoring malformed data message");
        MessageDisposition::Ignored {
            reason: err.to_string(),
        }
    }

    async fn on_arrival(&self, arrival: Arrival) -> TreatmentResult<MessageDisposition> {
        let Some(trip_id) = arrival.trip_id().map(str::to_string) else {
            warn!(session_id = %self.id, "Arrival without trip id");
            return Ok(MessageDisposition::Ignored {
                reason: "arrival without trip id".to_string(),
            });
        };

        let address = match arrival.address() {
            Some(address) => address.to_string(),
            None => self
                .trips
                .get(&trip_id)
                .await?
                .map(|trip| trip.address)
                .unwrap_or_default(),
        };

        {
            let mut state = self.state.lock();
            state.mode = AgentMode::DeliveryTreatment;
            state.current_trip = Some(trip_id.clone());
        }

        let prompt = self.controller.start(&trip_id, &address).await?;
        log_treatment_operation("start", &self.id.to_string(), Some(&trip_id), "started", None);

        Ok(MessageDisposition::TreatmentStarted { trip_id, prompt })
    }

    async fn on_photo(&self, signal: PhotoSignal, taken: bool) -> TreatmentResult<MessageDisposition> {
        let trip_id = signal
            .trip_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.current_trip())
            .unwrap_or_default();

        let outcome = self
            .controller
            .handle_photo_signal(&trip_id, taken, signal.event_id.as_deref())
            .await?;

        self.close_if_finished().await?;
        Ok(MessageDisposition::Signal(outcome))
    }

    /// After FINALIZE: record the result in the trip store, notify the app and hand back to
    /// the assistant
    async fn close_if_finished(&self) -> TreatmentResult<()> {
        let snapshot = self.machine().snapshot().await;
        if snapshot.state != TreatmentState::Finalize {
            return Ok(());
        }

        let context = snapshot.context;
        if !self.take_finished(&context.trip_id) {
            return Ok(());
        }

        let outcome = context.outcome();
        let reason = context
            .failure_description()
            .unwrap_or_else(|| "not delivered".to_string());

        let closed = if outcome.is_success() {
            self.trips.mark_completed(&context.trip_id).await?
        } else {
            self.trips.mark_cancelled(&context.trip_id, &reason).await?
        };

        if closed {
            if let Some(trip) = self.trips.get(&context.trip_id).await? {
                let notice = if outcome.is_success() {
                    OutboundMessage::trip_completed(&trip)
                } else {
                    OutboundMessage::trip_cancelled(&trip, reason)
                };
                if let Err(err) = self.publisher.publish(notice).await {
                    warn!(session_id = %self.id, trip_id = %trip.id, error = %err, "Failed to publish trip notice");
                }
            }
        }

        info!(
            session_id = %self.id,
            trip_id = %context.trip_id,
            outcome = %outcome,
            "Treatment closed, back to normal mode"
        );
        log_treatment_operation(
            "finish",
            &self.id.to_string(),
            Some(&context.trip_id),
            &outcome.to_string(),
            context.failure_description().as_deref(),
        );

        Ok(())
    }

    /// Switch back to normal mode if `trip_id` is still this session's treatment.
    ///
    /// Returns true for exactly one caller per treatment. A newer arrival owns the session
    /// and is left alone.
    fn take_finished(&self, trip_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.mode != AgentMode::DeliveryTreatment
            || state.current_trip.as_deref() != Some(trip_id)
        {
            return false;
        }
        state.mode = AgentMode::Normal;
        state.current_trip = None;
        true
    }
}
