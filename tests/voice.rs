//! Voice channel integration tests
//!
//! Uses provider and device doubles; no audio hardware or network needed

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use quest_guide::voice::{
    EndpointState, ListenOutcome, SAMPLE_RATE, SpeakOutcome, UtteranceDetector, VoiceParameters,
    VoiceRecognizer, VoiceSynthesizer, samples_to_wav,
};

mod common;

use common::{MockRecognition, MockSynthesis, RecordingSink};

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    vec![0.0; (SAMPLE_RATE as f32 * duration_secs) as usize]
}

fn synthesizer(client: Option<Arc<MockSynthesis>>, sink: Arc<RecordingSink>) -> VoiceSynthesizer {
    VoiceSynthesizer::new(
        client.map(|c| c as Arc<dyn quest_guide::voice::SynthesisClient>),
        sink,
        "voice-1",
        VoiceParameters::default(),
    )
}

#[tokio::test]
async fn test_speak_without_credential_is_skipped() {
    let sink = Arc::new(RecordingSink::default());
    let synth = synthesizer(None, sink.clone());

    assert!(!synth.is_enabled());
    assert_eq!(synth.speak("Hello there").await, SpeakOutcome::Skipped);
    assert_eq!(sink.plays.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_speak_plays_spoken_text() {
    let client = Arc::new(MockSynthesis::default());
    let sink = Arc::new(RecordingSink::default());
    let synth = synthesizer(Some(client.clone()), sink.clone());

    assert_eq!(synth.speak("🎯 Perfect. Now").await, SpeakOutcome::Played);
    assert_eq!(client.texts(), vec!["Perfect. Now".to_string()]);
    assert_eq!(sink.plays.load(Ordering::SeqCst), 1);
    assert!(!synth.is_speaking());

    let request = client.requests.lock().unwrap()[0].clone();
    assert_eq!(request.voice_id, "voice-1");
    assert_eq!(request.parameters, VoiceParameters::default());
}

#[tokio::test]
async fn test_provider_failure_reported_not_raised() {
    let client = Arc::new(MockSynthesis::failing());
    let sink = Arc::new(RecordingSink::default());
    let synth = synthesizer(Some(client), sink.clone());

    let outcome = synth.speak("Hello").await;
    assert!(matches!(outcome, SpeakOutcome::Failed(_)));
    assert_eq!(sink.plays.load(Ordering::SeqCst), 0);
    assert!(!synth.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn test_new_speak_supersedes_in_flight() {
    let client = Arc::new(MockSynthesis::with_delay(Duration::from_secs(1)));
    let sink = Arc::new(RecordingSink::default());
    let synth = Arc::new(synthesizer(Some(client.clone()), sink.clone()));

    let first = {
        let synth = Arc::clone(&synth);
        tokio::spawn(async move { synth.speak("first").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(synth.is_speaking());

    let second = synth.speak("second").await;

    assert_eq!(first.await.unwrap(), SpeakOutcome::Cancelled);
    assert_eq!(second, SpeakOutcome::Played);
    assert_eq!(sink.plays.load(Ordering::SeqCst), 1);
    assert_eq!(sink.stops.load(Ordering::SeqCst), 1);
    assert!(!synth.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_narration() {
    let client = Arc::new(MockSynthesis::with_delay(Duration::from_secs(1)));
    let sink = Arc::new(RecordingSink::default());
    let synth = Arc::new(synthesizer(Some(client), sink.clone()));

    let pending = {
        let synth = Arc::clone(&synth);
        tokio::spawn(async move { synth.speak("long story").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    synth.stop();
    assert_eq!(pending.await.unwrap(), SpeakOutcome::Cancelled);
    assert!(!synth.is_speaking());
    assert_eq!(sink.plays.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_last_begun_narration_wins() {
    let client = Arc::new(MockSynthesis::with_delay(Duration::from_millis(10)));
    let sink = Arc::new(RecordingSink::default());
    let synth = synthesizer(Some(client.clone()), sink.clone());

    let older = synth.begin("older").unwrap();
    let newer = synth.begin("newer").unwrap();

    assert_eq!(synth.complete(newer).await, SpeakOutcome::Played);
    assert_eq!(synth.complete(older).await, SpeakOutcome::Cancelled);
    assert_eq!(client.texts(), vec!["newer".to_string()]);
    assert_eq!(sink.plays.load(Ordering::SeqCst), 1);
    assert!(!synth.is_speaking());
}

#[tokio::test]
async fn test_listen_without_credential_is_skipped() {
    let recognizer = VoiceRecognizer::new(None);
    assert!(!recognizer.is_supported());
    assert_eq!(recognizer.listen().await, ListenOutcome::Skipped);
}

#[tokio::test]
async fn test_listen_unsupported_device() {
    let recognizer = VoiceRecognizer::new(Some(Arc::new(MockRecognition::unsupported())));
    assert!(!recognizer.is_supported());
    assert_eq!(recognizer.listen().await, ListenOutcome::Unsupported);
}

#[tokio::test]
async fn test_listen_returns_trimmed_transcript() {
    let recognizer = VoiceRecognizer::new(Some(Arc::new(MockRecognition::new([
        "  anxious energy  ",
    ]))));

    assert_eq!(
        recognizer.listen().await,
        ListenOutcome::Transcript("anxious energy".to_string())
    );
    assert!(!recognizer.is_listening());
}

#[tokio::test]
async fn test_listen_failure_reported() {
    let recognizer = VoiceRecognizer::new(Some(Arc::new(MockRecognition::new([]))));
    assert!(matches!(recognizer.listen().await, ListenOutcome::Failed(_)));

    let recognizer = VoiceRecognizer::new(Some(Arc::new(MockRecognition::new(["   "]))));
    assert!(matches!(recognizer.listen().await, ListenOutcome::Failed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_second_listen_rejected_while_listening() {
    let client = Arc::new(MockRecognition::new(["calm"]).with_delay(Duration::from_secs(2)));
    let recognizer = Arc::new(VoiceRecognizer::new(Some(client)));

    let first = {
        let recognizer = Arc::clone(&recognizer);
        tokio::spawn(async move { recognizer.listen().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(recognizer.is_listening());

    assert_eq!(recognizer.listen().await, ListenOutcome::Rejected);
    assert_eq!(
        first.await.unwrap(),
        ListenOutcome::Transcript("calm".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_listen_without_transcript() {
    let client = Arc::new(MockRecognition::new(["calm"]).with_delay(Duration::from_secs(2)));
    let recognizer = Arc::new(VoiceRecognizer::new(Some(client.clone())));

    let pending = {
        let recognizer = Arc::clone(&recognizer);
        tokio::spawn(async move { recognizer.listen().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    recognizer.stop();
    assert_eq!(pending.await.unwrap(), ListenOutcome::Stopped);
    assert_eq!(client.cancels.load(Ordering::SeqCst), 1);
    assert!(!recognizer.is_listening());
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_capture_runs() {
    let client = Arc::new(MockRecognition::new(["calm"]).with_delay(Duration::from_secs(30)));
    let recognizer = VoiceRecognizer::new(Some(client.clone()));

    let pending = recognizer.begin().unwrap();
    assert!(recognizer.is_listening());

    recognizer.stop();
    assert!(!recognizer.is_listening());
    assert_eq!(recognizer.complete(pending).await, ListenOutcome::Stopped);
    assert_eq!(client.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(client.transcripts.lock().unwrap().len(), 1);
}

#[test]
fn test_detector_finds_end_of_utterance() {
    let mut detector = UtteranceDetector::new();

    assert!(!detector.process(&generate_silence(0.2)));
    assert_eq!(detector.state(), EndpointState::Idle);

    assert!(!detector.process(&generate_sine_samples(440.0, 0.5, 0.3)));
    assert_eq!(detector.state(), EndpointState::Speaking);

    assert!(detector.process(&generate_silence(0.6)));
    assert_eq!(detector.state(), EndpointState::Complete);

    let utterance = detector.take_speech_buffer();
    assert_eq!(utterance.len(), 8000 + 9600);
    assert_eq!(detector.state(), EndpointState::Idle);
}

#[test]
fn test_samples_to_wav_roundtrip() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());
}
