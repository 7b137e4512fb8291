//! Voice input and output
//!
//! Narration and spoken answers sit behind small capability traits so the
//! conversation works the same with real providers, test doubles, or no
//! credential at all. [`VoiceSynthesizer`] and [`VoiceRecognizer`] wrap those
//! capabilities and keep at most one operation in flight per channel.

mod capture;
mod elevenlabs;
mod endpoint;
mod microphone;
mod playback;
mod recognizer;
mod synthesizer;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use elevenlabs::{DEFAULT_STT_MODEL, DEFAULT_TTS_MODEL, ElevenLabsStt, ElevenLabsTts};
pub use endpoint::{EndpointState, UtteranceDetector};
pub use microphone::{DEFAULT_MAX_WAIT, MicrophoneRecognition};
pub use playback::AudioPlayback;
pub use recognizer::{ListenOutcome, PendingListen, VoiceRecognizer};
pub use synthesizer::{PendingSpeech, SpeakOutcome, VoiceSynthesizer, spoken_text};

/// Tunable knobs passed to the synthesis provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParameters {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            stability: 0.75,
            similarity_boost: 0.8,
            style: 0.2,
            use_speaker_boost: false,
        }
    }
}

/// One synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// Provider voice identifier for the speaker
    pub voice_id: String,
    pub parameters: VoiceParameters,
}

/// Live state of one voice channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceSession {
    pub speaking: bool,
    pub listening: bool,
    pub active_request_id: Option<Uuid>,
}

/// Turns text into encoded audio
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    /// Synthesize speech, returning encoded audio (MP3)
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>>;
}

/// Plays encoded audio
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play audio to completion
    async fn play(&self, audio: Vec<u8>) -> Result<()>;

    /// Cut off whatever is playing
    fn stop(&self) {}
}

/// Turns recorded audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Captures one spoken utterance and returns its transcript
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Whether this client can capture audio at all
    fn is_supported(&self) -> bool;

    /// Capture and transcribe a single utterance
    async fn recognize(&self) -> Result<String>;

    /// Abandon a capture in progress
    fn cancel(&self) {}
}
