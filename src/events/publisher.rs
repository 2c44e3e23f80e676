use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::TreatmentResult;
use crate::treatment::OutboundMessage;

/// Sink for outbound structured messages
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: OutboundMessage) -> TreatmentResult<()>;
}

/// Message that has been published
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub message: OutboundMessage,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// In-process publisher fanning messages out to every subscriber
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<PublishedMessage>,
    published: Arc<AtomicU64>,
}

impl BroadcastPublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to messages published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total messages accepted since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessagePublisher for BroadcastPublisher {
    async fn publish(&self, message: OutboundMessage) -> TreatmentResult<()> {
        let message_type = message.message_type();
        let published = PublishedMessage {
            message,
            published_at: chrono::Utc::now(),
        };

        self.published.fetch_add(1, Ordering::Relaxed);

        // send() only fails when nobody is subscribed, which is fine for a fire-and-forget channel
        if self.sender.send(published).is_err() {
            debug!(message_type, "Published message with no subscribers");
        }

        Ok(())
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}
