use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing_subscriber::EnvFilter;

use quest_guide::script::DEFAULT_USER_NAME;
use quest_guide::store::{self, API_KEY_SETTING, USER_NAME_SETTING};
use quest_guide::terminal::{TranscriptRenderer, describe_notice, parse_input};
use quest_guide::voice::{
    AudioCapture, AudioPlayback, AudioSink, ElevenLabsStt, ElevenLabsTts, MicrophoneRecognition,
    RecognitionClient, SpeechRequest, SynthesisClient,
};
use quest_guide::{
    ChoiceHistory, Command as GuideCommand, Config, GuideRuntime, KeyValueStore, Script,
    SqliteStore, StepSequencer, VoiceRecognizer, VoiceSynthesizer,
};

/// Quest Guide - a scripted conversation with optional narration and voice answers
#[derive(Parser)]
#[command(name = "quest-guide", version, about)]
struct Cli {
    /// Session identifier; history is kept per session
    #[arg(short, long, env = "QUEST_GUIDE_SESSION", default_value = "default")]
    session: String,

    /// Conversation script (JSON); defaults to the built-in quest
    #[arg(long, env = "QUEST_GUIDE_SCRIPT")]
    script: Option<PathBuf>,

    /// Name used in prompts
    #[arg(long)]
    name: Option<String>,

    /// Disable narration and voice answers
    #[arg(long, env = "QUEST_GUIDE_NO_VOICE")]
    no_voice: bool,

    /// Read each step aloud as it appears
    #[arg(long)]
    narrate: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the conversation in this terminal (default)
    Chat,
    /// Print the choices recorded for a session
    History {
        /// Print the raw stored JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the ElevenLabs API key to the settings store
    SetKey {
        /// Key to save; prompted for when omitted
        key: Option<String>,
        /// Remove the saved key instead
        #[arg(long, conflicts_with = "key")]
        clear: bool,
    },
    /// Save the name used in prompts
    SetName { name: String },
    /// Interactive first-run setup
    Setup,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the quest guide narration.")]
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,quest_guide=info",
        1 => "info,quest_guide=debug",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None | Some(Command::Chat) => chat(&cli).await,
        Some(Command::History { json }) => history(&cli, json),
        Some(Command::SetKey { ref key, clear }) => set_key(&cli, key.clone(), clear),
        Some(Command::SetName { ref name }) => set_name(&cli, name),
        Some(Command::Setup) => quest_guide::setup::run_setup(),
        Some(Command::TestTts { ref text }) => test_tts(&cli, text).await,
        Some(Command::TestMic { duration }) => test_mic(duration).await,
    }
}

/// Load config and open the database, applying saved settings
fn load(cli: &Cli) -> anyhow::Result<(Config, store::DbPool)> {
    let mut config = Config::load(cli.no_voice)?;
    let db_path = config.database_path();
    let pool = store::init(&db_path)?;
    tracing::debug!(path = %db_path.display(), "database initialized");

    config.apply_settings(&SqliteStore::settings(pool.clone()));

    if let Some(name) = &cli.name {
        config.user_name = Some(name.clone());
    }
    if cli.narrate {
        config.voice.auto_narrate = true;
    }
    if let Some(script) = &cli.script {
        config.script_path = Some(script.clone());
    }

    Ok((config, pool))
}

/// Run the conversation in the terminal
async fn chat(cli: &Cli) -> anyhow::Result<()> {
    let (config, pool) = load(cli)?;

    let script = match &config.script_path {
        Some(path) => Script::load(path)?,
        None => Script::embedded()?,
    };
    let script = script.personalized(config.user_name.as_deref().unwrap_or(DEFAULT_USER_NAME));

    let session_store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::session(pool, &cli.session));
    let sequencer = StepSequencer::new(script, session_store, config.timing)
        .with_auto_narration(config.voice.auto_narrate);

    let (synthesizer, recognizer) = voice_channels(&config);
    if !synthesizer.is_enabled() {
        println!("(voice is off; set ELEVENLABS_API_KEY or run `quest-guide set-key` to enable it)");
    }

    tracing::info!(session = %cli.session, "starting conversation");
    let mut handle = GuideRuntime::new(sequencer, synthesizer, recognizer).spawn();

    let mut renderer = TranscriptRenderer::new();
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            changed = handle.view.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = handle.view.borrow_and_update().clone();
                print!("{}", renderer.render(&view));
                stdout.flush()?;
            }
            Some(notice) = handle.notices.recv() => {
                if let Some(text) = describe_notice(&notice) {
                    println!("{text}");
                }
            }
            line = lines.next() => {
                let command = match line {
                    Some(line) => {
                        let options = handle.view.borrow().options.clone();
                        parse_input(&line?, &options)
                    }
                    None => Some(GuideCommand::Quit),
                };
                let Some(command) = command else { continue };
                let quit = command == GuideCommand::Quit;
                if handle.commands.send(command).await.is_err() || quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = handle.commands.send(GuideCommand::Quit).await;
                break;
            }
        }
    }

    drop(handle.commands);
    handle.task.await?;
    println!("\nSession \"{}\" saved. See it with `quest-guide history`.", cli.session);

    Ok(())
}

/// Discards audio; used when there is no output device
struct SilentSink;

#[async_trait]
impl AudioSink for SilentSink {
    async fn play(&self, _audio: Vec<u8>) -> quest_guide::Result<()> {
        Ok(())
    }
}

/// Build the narration and voice-answer channels from config
fn voice_channels(config: &Config) -> (Arc<VoiceSynthesizer>, Arc<VoiceRecognizer>) {
    let voice = &config.voice;
    let key = || config.api_keys.elevenlabs().filter(|_| voice.enabled);

    if voice.enabled && key().is_none() {
        tracing::info!("no ElevenLabs key configured, running text-only");
    }

    let playback = match AudioPlayback::new() {
        Ok(playback) => Some(playback),
        Err(e) => {
            tracing::warn!(error = %e, "no audio output, narration disabled");
            None
        }
    };

    let tts: Option<Arc<dyn SynthesisClient>> = playback
        .is_some()
        .then(key)
        .flatten()
        .and_then(|k| match ElevenLabsTts::with_model(k, voice.tts_model.clone()) {
            Ok(tts) => Some(Arc::new(tts) as Arc<dyn SynthesisClient>),
            Err(e) => {
                tracing::warn!(error = %e, "narration unavailable");
                None
            }
        });
    let sink: Arc<dyn AudioSink> = match playback {
        Some(playback) => Arc::new(playback),
        None => Arc::new(SilentSink),
    };

    let stt: Option<Arc<dyn RecognitionClient>> =
        key().and_then(|k| match ElevenLabsStt::new(k, voice.stt_model.clone()) {
            Ok(stt) => Some(Arc::new(MicrophoneRecognition::new(Arc::new(stt)))
                as Arc<dyn RecognitionClient>),
            Err(e) => {
                tracing::warn!(error = %e, "voice answers unavailable");
                None
            }
        });

    let synthesizer = VoiceSynthesizer::new(tts, sink, voice.voice_id.clone(), voice.parameters);
    (Arc::new(synthesizer), Arc::new(VoiceRecognizer::new(stt)))
}

/// Print the choices recorded for the session
fn history(cli: &Cli, json: bool) -> anyhow::Result<()> {
    let (_, pool) = load(cli)?;
    let session = SqliteStore::session(pool, &cli.session);

    if json {
        let raw = session.get(store::CHOICES_KEY)?.unwrap_or_else(|| "[]".to_string());
        println!("{raw}");
        return Ok(());
    }

    let choices = ChoiceHistory::new(&session).load()?;
    if choices.is_empty() {
        println!("No choices recorded for session \"{}\"", cli.session);
        return Ok(());
    }

    for choice in choices {
        println!(
            "step {}: {} ({})",
            choice.step_index + 1,
            choice.choice_text,
            choice.recorded_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

/// Save or clear the voice credential
fn set_key(cli: &Cli, key: Option<String>, clear: bool) -> anyhow::Result<()> {
    let (_, pool) = load(cli)?;
    let settings = SqliteStore::settings(pool);

    if clear {
        settings.remove(API_KEY_SETTING)?;
        println!("Saved ElevenLabs key removed");
        return Ok(());
    }

    let key = match key {
        Some(key) => key,
        None => dialoguer::Password::new()
            .with_prompt("ElevenLabs API key")
            .interact()?,
    };
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    settings.set(API_KEY_SETTING, key)?;
    println!("ElevenLabs key saved");
    Ok(())
}

/// Save the name used in prompts
fn set_name(cli: &Cli, name: &str) -> anyhow::Result<()> {
    let (_, pool) = load(cli)?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("name must not be empty");
    }
    SqliteStore::settings(pool).set(USER_NAME_SETTING, name)?;
    println!("The guide will call you {name}");
    Ok(())
}

/// Test TTS output
async fn test_tts(cli: &Cli, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let (config, _) = load(cli)?;
    let key = config
        .api_keys
        .elevenlabs()
        .ok_or_else(|| anyhow::anyhow!("no ElevenLabs key; set ELEVENLABS_API_KEY or run set-key"))?;

    let tts = ElevenLabsTts::with_model(key, config.voice.tts_model.clone())?;
    let request = SpeechRequest {
        text: text.to_string(),
        voice_id: config.voice.voice_id.clone(),
        parameters: config.voice.parameters,
    };

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(&request).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    AudioPlayback::new()?.play(mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, narration is working!");

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    // The capture stream is tied to the thread that opened it
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;
        println!("Sample rate: {} Hz", quest_guide::voice::SAMPLE_RATE);
        println!("---");

        for i in 0..duration {
            std::thread::sleep(Duration::from_secs(1));

            let samples = capture.take_buffer();
            let energy = calculate_rms(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

            println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
        }

        capture.stop();
        Ok(())
    })
    .await??;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
