//! Configuration management for the quest guide
//!
//! Values are layered: defaults, then the TOML file, then environment
//! variables. CLI flags are applied last by the binary. The voice credential
//! may additionally come from the settings store when neither the
//! environment nor the file supplies one.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::Result;
use crate::conversation::Timing;
use crate::store::{API_KEY_SETTING, KeyValueStore, USER_NAME_SETTING};
use crate::voice::VoiceParameters;
use file::GuideConfigFile;

/// Default speaker voice
pub const DEFAULT_VOICE_ID: &str = "9BWtsMINqrJLrRacOk9x";

/// Environment variable holding the voice credential
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Quest guide configuration
#[derive(Debug)]
pub struct Config {
    /// Directory holding the session database
    pub data_dir: PathBuf,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Conversation pacing
    pub timing: Timing,

    /// API keys
    pub api_keys: ApiKeys,

    /// Name substituted into prompts
    pub user_name: Option<String>,

    /// Custom script file; the embedded script is used when unset
    pub script_path: Option<PathBuf>,
}

/// Voice configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable narration and spoken answers
    pub enabled: bool,

    /// Speaker voice identifier
    pub voice_id: String,

    /// TTS model (e.g. "`eleven_multilingual_v2`")
    pub tts_model: String,

    /// STT model (e.g. "`scribe_v1`")
    pub stt_model: String,

    pub parameters: VoiceParameters,

    /// Narrate each step automatically once it is revealed
    pub auto_narrate: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            tts_model: crate::voice::DEFAULT_TTS_MODEL.to_string(),
            stt_model: crate::voice::DEFAULT_STT_MODEL.to_string(),
            parameters: VoiceParameters::default(),
            auto_narrate: false,
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `ElevenLabs` key, shared by narration and transcription
    pub elevenlabs: Option<SecretString>,
}

impl ApiKeys {
    /// A fresh handle to the voice credential, if one is configured
    #[must_use]
    pub fn elevenlabs(&self) -> Option<SecretString> {
        self.elevenlabs
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_string()))
    }
}

/// Default data directory (`~/.local/share/quest-guide` on Linux)
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "quest-guide")
        .map_or_else(|| PathBuf::from(".quest-guide"), |d| d.data_dir().to_path_buf())
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load(disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file();
        let mut config = Self::from_sources(fc, |name| std::env::var(name).ok());

        if disable_voice {
            tracing::info!("voice explicitly disabled via --no-voice");
            config.voice.enabled = false;
        }

        std::fs::create_dir_all(&config.data_dir)?;
        Ok(config)
    }

    /// Build a config from a parsed file and an environment lookup
    ///
    /// Environment values win over file values, which win over defaults.
    pub fn from_sources(fc: GuideConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = VoiceConfig::default();
        let base_params = defaults.parameters;

        let voice = VoiceConfig {
            enabled: env("QUEST_GUIDE_VOICE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.voice.enabled)
                .unwrap_or(defaults.enabled),
            voice_id: env("QUEST_GUIDE_VOICE_ID")
                .or(fc.voice.voice_id)
                .unwrap_or(defaults.voice_id),
            tts_model: env("QUEST_GUIDE_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            stt_model: env("QUEST_GUIDE_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.stt_model),
            parameters: VoiceParameters {
                stability: fc.voice.stability.unwrap_or(base_params.stability),
                similarity_boost: fc
                    .voice
                    .similarity_boost
                    .unwrap_or(base_params.similarity_boost),
                style: fc.voice.style.unwrap_or(base_params.style),
                use_speaker_boost: fc
                    .voice
                    .use_speaker_boost
                    .unwrap_or(base_params.use_speaker_boost),
            },
            auto_narrate: fc.voice.auto_narrate.unwrap_or(defaults.auto_narrate),
        };

        let base_timing = Timing::default();
        let ms = |value: Option<u64>, fallback: Duration| {
            value.map_or(fallback, Duration::from_millis)
        };
        let timing = Timing {
            typing_delay: ms(fc.timing.typing_delay_ms, base_timing.typing_delay),
            reveal_cadence: ms(fc.timing.reveal_cadence_ms, base_timing.reveal_cadence),
            auto_advance_delay: ms(
                fc.timing.auto_advance_delay_ms,
                base_timing.auto_advance_delay,
            ),
            choice_delay: ms(fc.timing.choice_delay_ms, base_timing.choice_delay),
        };

        let api_keys = ApiKeys {
            elevenlabs: env(API_KEY_ENV)
                .or(fc.api_keys.elevenlabs)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
        };

        let data_dir = env("QUEST_GUIDE_DATA_DIR")
            .or(fc.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        Self {
            data_dir,
            voice,
            timing,
            api_keys,
            user_name: env("QUEST_GUIDE_USER_NAME").or(fc.user_name),
            script_path: fc.script.map(PathBuf::from),
        }
    }

    /// Fill gaps from values saved in the settings store
    ///
    /// Read failures are logged and leave the config unchanged.
    pub fn apply_settings(&mut self, settings: &dyn KeyValueStore) {
        if self.api_keys.elevenlabs.is_none() {
            match settings.get(API_KEY_SETTING) {
                Ok(Some(key)) if !key.trim().is_empty() => {
                    tracing::debug!("using voice credential from settings store");
                    self.api_keys.elevenlabs = Some(SecretString::from(key));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "failed to read saved credential"),
            }
        }

        if self.user_name.is_none() {
            match settings.get(USER_NAME_SETTING) {
                Ok(name) => self.user_name = name.filter(|n| !n.trim().is_empty()),
                Err(e) => tracing::warn!(error = %e, "failed to read saved user name"),
            }
        }
    }

    /// Path of the session database
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("quest-guide.db")
    }

    /// Whether narration and spoken answers can be offered
    #[must_use]
    pub const fn voice_available(&self) -> bool {
        self.voice.enabled && self.api_keys.elevenlabs.is_some()
    }
}
