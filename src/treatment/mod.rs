//! # Delivery Treatment Workflow
//!
//! States, events, guards and actions of the delivery confirmation dialogue, and the
//! [`DeliveryTreatmentMachine`] that wires them into the generic engine.

pub mod actions;
pub mod events;
pub mod guards;
pub mod machine;
pub mod messages;
pub mod states;

pub use events::{TreatmentEvent, TreatmentEventKind};
pub use machine::{
    build_treatment_transitions, DeliveryTreatmentMachine, TreatmentEngine, TreatmentOutcome,
    TreatmentTable,
};
pub use messages::OutboundMessage;
pub use states::{ExpectedInput, TreatmentState};
