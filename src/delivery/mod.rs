//! # Delivery Domain
//!
//! Value types and pure business rules for a delivery attempt: the non-delivery reasons,
//! which of them need photo proof or a free-text detail, and the context a treatment
//! collects.

pub mod context;
pub mod failure_reason;
pub mod rules;

pub use context::{DeliveryContext, DeliveryOutcome, PhotoOutcome};
pub use failure_reason::FailureReason;
pub use rules::DeliveryRules;
