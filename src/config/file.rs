//! TOML configuration file loading
//!
//! Supports `~/.config/quest-guide/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GuideConfigFile {
    /// Name substituted into script prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Path to a custom conversation script (JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Directory for the session database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Conversation pacing
    #[serde(default)]
    pub timing: TimingFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Speaker voice identifier (e.g. "9BWtsMINqrJLrRacOk9x")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<bool>,

    /// Narrate each step as it appears
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_narrate: Option<bool>,
}

/// Pacing overrides, all in milliseconds
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TimingFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal_cadence_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_advance_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_delay_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `GuideConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> GuideConfigFile {
    let Some(path) = config_file_path() else {
        return GuideConfigFile::default();
    };

    if !path.exists() {
        return GuideConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            GuideConfigFile::default()
        }
    }
}

/// Parse a config file at `path`
///
/// # Errors
///
/// Returns error if the file can't be read or isn't valid TOML
pub fn read_config_file(path: &Path) -> Result<GuideConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Write a config file to `path`, creating parent directories
///
/// # Errors
///
/// Returns error if serialization or the write fails
pub fn write_config_file(path: &Path, config: &GuideConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Return the config file path: `~/.config/quest-guide/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("quest-guide").join("config.toml"))
}
