//! # Outbound Messaging
//!
//! Publishing seam between the treatment workflow and whatever transport carries its
//! structured messages to the companion app.

pub mod publisher;

pub use publisher::{BroadcastPublisher, MessagePublisher, PublishedMessage};
