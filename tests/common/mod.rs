//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quest_guide::voice::{AudioSink, RecognitionClient, SpeechRequest, SynthesisClient};
use quest_guide::{Error, MemoryStore, Result, Script, StepSequencer, Timing};

/// Three steps: a greeting, a question with five options, and a send-off
pub fn three_step_script() -> Script {
    Script::new(
        "three-step",
        [
            ("✨ Welcome, traveler.", vec![]),
            (
                "🎯 How are you feeling right now?",
                vec![
                    "😌 Calm and centered".to_string(),
                    "⚡ Anxious energy coursing through me".to_string(),
                    "😔 Heavy and tired".to_string(),
                    "🔥 Fired up and ready".to_string(),
                    "🌫️ Foggy and unsure".to_string(),
                ],
            ),
            ("🌟 Thank you for sharing.", vec![]),
        ],
    )
}

/// A sequencer over a fresh in-memory store
pub fn memory_sequencer(script: Script, timing: Timing) -> (StepSequencer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let sequencer = StepSequencer::new(script, store.clone(), timing);
    (sequencer, store)
}

/// Synthesis double that returns fixed bytes after an optional delay
#[derive(Default)]
pub struct MockSynthesis {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<SpeechRequest>>,
    pub delay: Duration,
    pub fail: bool,
}

impl MockSynthesis {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }
}

#[async_trait]
impl SynthesisClient for MockSynthesis {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(Error::Tts("provider unavailable".to_string()));
        }
        Ok(vec![0xFF, 0xFB, 0x90, 0x00])
    }
}

/// Sink double that records what it was asked to play
#[derive(Default)]
pub struct RecordingSink {
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, _audio: Vec<u8>) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Recognition double that replays scripted transcripts
pub struct MockRecognition {
    pub supported: bool,
    pub delay: Duration,
    pub transcripts: Mutex<VecDeque<Result<String>>>,
    pub cancels: AtomicUsize,
}

impl MockRecognition {
    pub fn new(transcripts: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            supported: true,
            delay: Duration::from_millis(10),
            transcripts: Mutex::new(transcripts.into_iter().map(|t| Ok(t.to_string())).collect()),
            cancels: AtomicUsize::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new([])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RecognitionClient for MockRecognition {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn recognize(&self) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Stt("no transcript queued".to_string())))
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
