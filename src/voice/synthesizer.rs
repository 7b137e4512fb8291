//! Narration with at most one request in flight

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

use super::{AudioSink, SpeechRequest, SynthesisClient, VoiceParameters, VoiceSession};

/// How a `speak` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Audio played to the end
    Played,
    /// No credential configured, or nothing to say; nothing was attempted
    Skipped,
    /// Superseded by a newer request or stopped
    Cancelled,
    /// Provider or playback error
    Failed(String),
}

/// A narration that has been started
pub struct PendingSpeech {
    request_id: Uuid,
    handle: JoinHandle<crate::Result<()>>,
}

#[derive(Default)]
struct Inner {
    session: VoiceSession,
    in_flight: Option<AbortHandle>,
}

/// Speaks text for one logical speaker
pub struct VoiceSynthesizer {
    client: Option<Arc<dyn SynthesisClient>>,
    sink: Arc<dyn AudioSink>,
    voice_id: String,
    parameters: VoiceParameters,
    inner: Mutex<Inner>,
}

impl VoiceSynthesizer {
    /// Create a synthesizer; `client` is `None` when no credential is configured
    #[must_use]
    pub fn new(
        client: Option<Arc<dyn SynthesisClient>>,
        sink: Arc<dyn AudioSink>,
        voice_id: impl Into<String>,
        parameters: VoiceParameters,
    ) -> Self {
        Self {
            client,
            sink,
            voice_id: voice_id.into(),
            parameters,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Whether a synthesis capability is configured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Snapshot of the channel state
    #[must_use]
    pub fn session(&self) -> VoiceSession {
        self.lock().session.clone()
    }

    /// Whether narration is currently in progress
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.lock().session.speaking
    }

    /// Synthesize and play `text`, superseding any narration in flight
    pub async fn speak(&self, text: &str) -> SpeakOutcome {
        match self.begin(text) {
            Ok(pending) => self.complete(pending).await,
            Err(outcome) => outcome,
        }
    }

    /// Supersede any narration in flight and start `text` on a background task
    ///
    /// Requests begun in order take effect in order: the last one begun is the
    /// one left playing.
    ///
    /// # Errors
    ///
    /// Returns the final outcome when nothing was started
    pub fn begin(&self, text: &str) -> Result<PendingSpeech, SpeakOutcome> {
        let Some(client) = self.client.clone() else {
            tracing::debug!("no voice credential configured, skipping narration");
            return Err(SpeakOutcome::Skipped);
        };

        let text = spoken_text(text);
        if text.is_empty() {
            return Err(SpeakOutcome::Skipped);
        }

        let request = SpeechRequest {
            text: text.to_string(),
            voice_id: self.voice_id.clone(),
            parameters: self.parameters,
        };
        let request_id = Uuid::new_v4();
        let sink = Arc::clone(&self.sink);

        let mut inner = self.lock();
        if let Some(previous) = inner.in_flight.take() {
            tracing::debug!(
                superseded = ?inner.session.active_request_id,
                "superseding narration in flight"
            );
            previous.abort();
            self.sink.stop();
        }

        let handle = tokio::spawn(async move {
            let audio = client.synthesize(&request).await?;
            sink.play(audio).await
        });

        inner.in_flight = Some(handle.abort_handle());
        inner.session.speaking = true;
        inner.session.active_request_id = Some(request_id);
        Ok(PendingSpeech { request_id, handle })
    }

    /// Wait for a narration started with `begin`
    pub async fn complete(&self, pending: PendingSpeech) -> SpeakOutcome {
        let result = pending.handle.await;
        self.finish(pending.request_id);

        match result {
            Ok(Ok(())) => SpeakOutcome::Played,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "narration failed");
                SpeakOutcome::Failed(e.to_string())
            }
            Err(e) if e.is_cancelled() => SpeakOutcome::Cancelled,
            Err(e) => {
                tracing::error!(error = %e, "narration task failed");
                SpeakOutcome::Failed(e.to_string())
            }
        }
    }

    /// Stop narration in flight, if any
    pub fn stop(&self) {
        let mut inner = self.lock();
        if let Some(handle) = inner.in_flight.take() {
            handle.abort();
            self.sink.stop();
            tracing::debug!("narration stopped");
        }
        inner.session = VoiceSession::default();
    }

    fn finish(&self, request_id: Uuid) {
        let mut inner = self.lock();
        if inner.session.active_request_id == Some(request_id) {
            inner.session = VoiceSession::default();
            inner.in_flight = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Text as it should be spoken: leading emoji and symbols removed
#[must_use]
pub fn spoken_text(text: &str) -> &str {
    text.trim_start_matches(|c: char| !c.is_alphanumeric()).trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spoken_text_strips_leading_symbols() {
        assert_eq!(spoken_text("🎯 Perfect. Now"), "Perfect. Now");
        assert_eq!(spoken_text("🎮 Quest Complete!  "), "Quest Complete!");
        assert_eq!(spoken_text("plain"), "plain");
        assert_eq!(spoken_text("✨ "), "");
    }
}
