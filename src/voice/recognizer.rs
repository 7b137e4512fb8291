//! Single-shot voice answers

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

use super::{RecognitionClient, VoiceSession};

/// How a `listen` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// An utterance was captured and transcribed
    Transcript(String),
    /// Caller stopped the session
    Stopped,
    /// Capture or transcription failed
    Failed(String),
    /// This client cannot capture audio
    Unsupported,
    /// No credential configured
    Skipped,
    /// Another listen is already in progress
    Rejected,
}

/// A registered listen whose capture is running
pub struct PendingListen {
    request_id: Uuid,
    handle: JoinHandle<crate::Result<String>>,
}

#[derive(Default)]
struct Inner {
    session: VoiceSession,
    in_flight: Option<AbortHandle>,
}

/// Captures one utterance per call
pub struct VoiceRecognizer {
    client: Option<Arc<dyn RecognitionClient>>,
    inner: Mutex<Inner>,
}

impl VoiceRecognizer {
    /// Create a recognizer; `client` is `None` when no credential is configured
    #[must_use]
    pub fn new(client: Option<Arc<dyn RecognitionClient>>) -> Self {
        Self {
            client,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Whether voice answers can be offered at all
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_supported())
    }

    /// Whether a listen is in progress
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.lock().session.listening
    }

    /// Snapshot of the channel state
    #[must_use]
    pub fn session(&self) -> VoiceSession {
        self.lock().session.clone()
    }

    /// Capture a single utterance
    pub async fn listen(&self) -> ListenOutcome {
        match self.begin() {
            Ok(pending) => self.complete(pending).await,
            Err(outcome) => outcome,
        }
    }

    /// Register a listen and start capturing on a background task
    ///
    /// The session counts as listening as soon as this returns, so a `stop`
    /// issued before the capture task first runs still cancels it.
    ///
    /// # Errors
    ///
    /// Returns the final outcome when no capture was started
    pub fn begin(&self) -> Result<PendingListen, ListenOutcome> {
        let Some(client) = self.client.clone() else {
            tracing::debug!("no voice credential configured, voice input disabled");
            return Err(ListenOutcome::Skipped);
        };

        if !client.is_supported() {
            tracing::warn!("voice input not supported on this device");
            return Err(ListenOutcome::Unsupported);
        }

        let mut inner = self.lock();
        if inner.session.listening {
            tracing::debug!("listen rejected, already listening");
            return Err(ListenOutcome::Rejected);
        }

        let request_id = Uuid::new_v4();
        let handle = tokio::spawn(async move { client.recognize().await });
        inner.in_flight = Some(handle.abort_handle());
        inner.session.listening = true;
        inner.session.active_request_id = Some(request_id);

        tracing::debug!(%request_id, "listening for an answer");
        Ok(PendingListen { request_id, handle })
    }

    /// Wait for a listen started with `begin`
    pub async fn complete(&self, pending: PendingListen) -> ListenOutcome {
        let result = pending.handle.await;
        self.finish(pending.request_id);

        match result {
            Ok(Ok(transcript)) if transcript.trim().is_empty() => {
                ListenOutcome::Failed("no speech recognized".to_string())
            }
            Ok(Ok(transcript)) => ListenOutcome::Transcript(transcript.trim().to_string()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "voice input failed");
                ListenOutcome::Failed(e.to_string())
            }
            Err(e) if e.is_cancelled() => ListenOutcome::Stopped,
            Err(e) => {
                tracing::error!(error = %e, "voice input task failed");
                ListenOutcome::Failed(e.to_string())
            }
        }
    }

    /// End the listen in progress without a transcript
    pub fn stop(&self) {
        let mut inner = self.lock();
        if let Some(handle) = inner.in_flight.take() {
            handle.abort();
            if let Some(client) = &self.client {
                client.cancel();
            }
            tracing::debug!("listening stopped");
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
