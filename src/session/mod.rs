//! # Session Layer
//!
//! The data-channel JSON contract and the per-driver [`VoiceSession`] that owns one
//! treatment instance.

pub mod inbound;
pub mod voice_session;

pub use inbound::{Arrival, InboundMessage, PhotoSignal};
pub use voice_session::{AgentMode, MessageDisposition, TurnDisposition, VoiceSession};
