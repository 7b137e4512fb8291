//! Recognition from the local microphone

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::endpoint::UtteranceDetector;
use super::{RecognitionClient, Transcriber};
use crate::{Error, Result};

/// Default time to wait for an answer to finish
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15);

/// Captures one utterance from the default input device and transcribes it
pub struct MicrophoneRecognition {
    transcriber: Arc<dyn Transcriber>,
    max_wait: Duration,
    cancelled: Arc<AtomicBool>,
}

impl MicrophoneRecognition {
    #[must_use]
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            max_wait: DEFAULT_MAX_WAIT,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

#[async_trait]
impl RecognitionClient for MicrophoneRecognition {
    fn is_supported(&self) -> bool {
        AudioCapture::is_available()
    }

    async fn recognize(&self) -> Result<String> {
        self.cancelled.store(false, Ordering::SeqCst);

        let cancelled = Arc::clone(&self.cancelled);
        let max_wait = self.max_wait;
        let samples = tokio::task::spawn_blocking(move || {
            let mut capture = AudioCapture::new()?;
            let mut detector = UtteranceDetector::new();
            capture.capture_utterance(&mut detector, max_wait, &cancelled)
        })
        .await
        .map_err(|e| Error::Audio(e.to_string()))??;

        if samples.is_empty() {
            return Ok(String::new());
        }

        tracing::debug!(samples = samples.len(), "transcribing utterance");
        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        self.transcriber.transcribe(wav).await
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
