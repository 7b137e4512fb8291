//! ElevenLabs speech providers
//!
//! Both directions use the same API key.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{SpeechRequest, SynthesisClient, Transcriber};
use crate::{Error, Result};

const API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Default text-to-speech model
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";

/// Default speech-to-text model
pub const DEFAULT_STT_MODEL: &str = "scribe_v1";

/// Response from the speech-to-text endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// ElevenLabs text-to-speech
pub struct ElevenLabsTts {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl ElevenLabsTts {
    /// Create a TTS client with the default model
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_model(api_key, DEFAULT_TTS_MODEL.to_string())
    }

    /// Create a TTS client with a custom model
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn with_model(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SynthesisClient for ElevenLabsTts {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct VoiceSettings {
            stability: f32,
            similarity_boost: f32,
            style: f32,
            use_speaker_boost: bool,
        }

        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            voice_settings: VoiceSettings,
        }

        let url = format!(
            "{}/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            request.voice_id
        );

        let body = TtsRequest {
            text: &request.text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: request.parameters.stability,
                similarity_boost: request.parameters.similarity_boost,
                style: request.parameters.style,
                use_speaker_boost: request.parameters.use_speaker_boost,
            },
        };

        tracing::debug!(
            voice = %request.voice_id,
            chars = request.text.chars().count(),
            "requesting speech"
        );

        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "received speech audio");
        Ok(audio.to_vec())
    }
}

/// ElevenLabs speech-to-text
pub struct ElevenLabsStt {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    language: Option<String>,
    base_url: String,
}

impl ElevenLabsStt {
    /// Create an STT client
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn new(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for STT".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            language: None,
            base_url: API_BASE.to_string(),
        })
    }

    /// Hint the spoken language (ISO code such as "en")
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Point the client at a different API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Transcriber for ElevenLabsStt {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model_id", self.model.clone());

        if let Some(language) = &self.language {
            form = form.text("language_code", language.clone());
        }

        let url = format!("{}/speech-to-text", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "ElevenLabs STT error");
            return Err(Error::Stt(format!("ElevenLabs STT error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(ElevenLabsTts::new(SecretString::from(String::new())).is_err());
        assert!(
            ElevenLabsStt::new(SecretString::from(String::new()), DEFAULT_STT_MODEL.to_string())
                .is_err()
        );
    }

    #[test]
    fn test_key_accepted() {
        assert!(ElevenLabsTts::new(SecretString::from("key".to_string())).is_ok());
    }
}
