//! Interactive first-run setup wizard (`quest-guide setup`)

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Password};

use crate::config::file::{self, GuideConfigFile, VoiceFileConfig};
use crate::script::DEFAULT_USER_NAME;

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Quest Guide Setup\n");

    let existing = file::load_config_file();
    let config_path = file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/quest-guide/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Name used in prompts
    let user_name: String = Input::new()
        .with_prompt("What should the guide call you?")
        .default(
            existing
                .user_name
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
        )
        .interact_text()?;

    // 2. Voice (optional)
    let enable_voice = Confirm::new()
        .with_prompt("Enable narration and spoken answers (ElevenLabs)?")
        .default(existing.voice.enabled.unwrap_or(true))
        .interact()?;

    let mut api_keys = existing.api_keys;
    let voice = if enable_voice {
        let prompt = api_keys.elevenlabs.as_deref().map_or_else(
            || "ElevenLabs API key (ELEVENLABS_API_KEY, blank to skip)".to_string(),
            |k| format!("ElevenLabs API key (current: {}, blank to keep)", mask(k)),
        );
        let key = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        if !key.trim().is_empty() {
            api_keys.elevenlabs = Some(key.trim().to_string());
        }

        let auto_narrate = Confirm::new()
            .with_prompt("Read each step aloud automatically?")
            .default(existing.voice.auto_narrate.unwrap_or(false))
            .interact()?;

        VoiceFileConfig {
            enabled: Some(true),
            auto_narrate: Some(auto_narrate),
            ..existing.voice
        }
    } else {
        VoiceFileConfig {
            enabled: Some(false),
            ..existing.voice
        }
    };

    let config_file = GuideConfigFile {
        user_name: Some(user_name),
        script: existing.script,
        data_dir: existing.data_dir,
        voice,
        timing: existing.timing,
        api_keys,
    };

    file::write_config_file(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `quest-guide chat` to begin.");

    Ok(())
}

/// Show only the ends of a secret
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("sk_1234567890"), "sk_1...7890");
        assert_eq!(mask("short"), "****");
    }
}
