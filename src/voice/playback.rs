//! Speaker output for narration

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use super::AudioSink;
use crate::{Error, Result};

/// Sample rate for playback (matches provider MP3 output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// How often the blocking player checks for completion or a stop
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays MP3 audio to the default output device
pub struct AudioPlayback {
    config: StreamConfig,
    stops: StopSlot,
}

/// Stop flag of the most recent play; each play gets a fresh one so a stop
/// aimed at an older play cannot be cleared by a newer one
#[derive(Default)]
struct StopSlot {
    current: Mutex<Arc<AtomicBool>>,
}

impl StopSlot {
    /// Stop the previous play and hand out the flag for the next one
    fn next(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        let previous = std::mem::replace(&mut *self.lock(), Arc::clone(&flag));
        previous.store(true, Ordering::SeqCst);
        flag
    }

    fn stop(&self) {
        self.lock().store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Arc<AtomicBool>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device supports the playback rate
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports = |channels: u16| {
            move |c: &cpal::SupportedStreamConfigRange| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            }
        };

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(supports(1))
            .or_else(|| device.supported_output_configs().ok()?.find(supports(2)))
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            config,
            stops: StopSlot::default(),
        })
    }
}

#[async_trait]
impl AudioSink for AudioPlayback {
    async fn play(&self, audio: Vec<u8>) -> Result<()> {
        let samples = decode_mp3(&audio)?;
        let stopped = self.stops.next();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || play_blocking(&config, samples, &stopped))
            .await
            .map_err(|e| Error::Audio(e.to_string()))?
    }

    fn stop(&self) {
        self.stops.stop();
    }
}

/// Play samples on the current thread until done or stopped
fn play_blocking(config: &StreamConfig, samples: Vec<f32>, stopped: &AtomicBool) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels);
    let sample_count = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if pos < samples.len() {
                            pos += 1;
                        }
                    }
                    position.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let timeout = Duration::from_millis(duration_ms + 500);
    let start = Instant::now();

    while position.load(Ordering::Relaxed) < sample_count && start.elapsed() < timeout {
        if stopped.load(Ordering::SeqCst) {
            tracing::debug!("playback stopped early");
            return Ok(());
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    // Let the device drain its last buffer
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reaches_superseded_play() {
        let slot = StopSlot::default();
        let old = slot.next();
        slot.stop();
        let new = slot.next();

        assert!(old.load(Ordering::SeqCst));
        assert!(!new.load(Ordering::SeqCst));

        slot.stop();
        assert!(new.load(Ordering::SeqCst));
    }

    #[test]
    fn test_new_play_stops_the_one_before() {
        let slot = StopSlot::default();
        let old = slot.next();
        let _new = slot.next();
        assert!(old.load(Ordering::SeqCst));
    }

    #[test]
    fn test_decode_empty_input_yields_no_samples() {
        assert!(decode_mp3(&[]).unwrap().is_empty());
    }
}
