use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TreatmentResult;

/// Text-to-speech collaborator. The core only hands it finished prompt text.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn say(&self, text: &str) -> TreatmentResult<()>;
}

/// Sink that keeps everything it was asked to say, in order
///
/// ```rust
/// use treatment_core::turn::{RecordingSpeech, SpeechSink};
///
/// # tokio_test::block_on(async {
/// let speech = RecordingSpeech::new();
/// speech.say("Please take a photo of the package.").await.unwrap();
/// assert_eq!(speech.spoken().len(), 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.spoken.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.spoken.lock().clear();
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeech {
    async fn say(&self, text: &str) -> TreatmentResult<()> {
        self.spoken.lock().push(text.to_string());
        Ok(())
    }
}
