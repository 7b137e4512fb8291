//! Utterance endpointing
//!
//! Energy-based detection of where a spoken answer starts and ends, so a
//! single listen returns once the speaker pauses.

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to accept (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration that ends an utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the endpoint detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointState {
    /// Waiting for speech
    #[default]
    Idle,
    /// Speech detected, accumulating
    Speaking,
    /// Enough speech followed by silence
    Complete,
}

/// Finds the end of a spoken utterance in a stream of samples
#[derive(Debug, Default)]
pub struct UtteranceDetector {
    state: EndpointState,
    speech_buffer: Vec<f32>,
    voiced_samples: usize,
    silence_counter: usize,
}

impl UtteranceDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed samples; returns true once the utterance is complete
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Idle => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES
                    && self.voiced_samples > MIN_SPEECH_SAMPLES
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    self.state = EndpointState::Complete;
                    return true;
                }

                // A blip followed by long silence was noise
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    tracing::trace!("discarding short noise burst");
                    self.reset();
                }
            }
            EndpointState::Complete => return true,
        }

        false
    }

    /// Take the captured utterance, returning the detector to idle
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        let buffer = std::mem::take(&mut self.speech_buffer);
        self.reset();
        buffer
    }

    pub fn reset(&mut self) {
        self.state = EndpointState::Idle;
        self.speech_buffer.clear();
        self.voiced_samples = 0;
        self.silence_counter = 0;
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
