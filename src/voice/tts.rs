//! Text-to-speech (TTS) processing

use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::translate::primary_subtag;
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Synthesizes speech from text as MP3
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    model: String,
    provider: TtsProvider,
    base_url: String,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, voice: String, model: String) -> Result<Self> {
        Self::new(TtsProvider::OpenAI, api_key, voice, model)
    }

    /// Create a new TTS instance using ElevenLabs
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: SecretString, voice_id: String, model: String) -> Result<Self> {
        Self::new(TtsProvider::ElevenLabs, api_key, voice_id, model)
    }

    /// Create a new TTS instance for `provider`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        provider: TtsProvider,
        api_key: SecretString,
        voice: String,
        model: String,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!("{provider:?} API key required for TTS")));
        }

        let base_url = match provider {
            TtsProvider::OpenAI => OPENAI_BASE_URL,
            TtsProvider::ElevenLabs => ELEVENLABS_BASE_URL,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            model,
            provider,
            base_url: base_url.to_string(),
        })
    }

    /// Point at a different API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Synthesize `text` spoken in `language` at `rate`
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns `Synthesis` if synthesis fails
    pub async fn synthesize(&self, text: &str, language: &str, rate: f32) -> Result<Vec<u8>> {
        let result = match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text, rate).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, language, rate).await,
        };

        result.map_err(|e| match e {
            Error::Synthesis(_) => e,
            other => Error::Synthesis(other.to_string()),
        })
    }

    /// Synthesize using OpenAI TTS; the voice speaks any input language
    async fn synthesize_openai(&self, text: &str, rate: f32) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: rate.clamp(0.25, 4.0),
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "OpenAI speech synthesized");
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str, language: &str, rate: f32) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct VoiceSettings {
            speed: f32,
        }

        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            language_code: String,
            voice_settings: VoiceSettings,
        }

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            language_code: primary_subtag(language),
            // ElevenLabs accepts a narrower speed range
            voice_settings: VoiceSettings {
                speed: rate.clamp(0.7, 1.2),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text-to-speech/{}", self.base_url, self.voice))
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "ElevenLabs speech synthesized");
        Ok(audio.to_vec())
    }
}
