//! Configuration management for voxlate
//!
//! Every setting resolves as env var > TOML file > default.

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::capability::VoiceParams;
use crate::orchestrator::LanguagePair;
use crate::translate::{DEFAULT_TIMEOUT, TranslateProvider};
use crate::voice::{SttProvider, TtsProvider};
use crate::Result;

use self::file::VoxlateConfigFile;

/// Default source language
pub const DEFAULT_FROM: &str = "en-US";

/// Default target language
pub const DEFAULT_TO: &str = "es-ES";

/// voxlate configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language pair for new sessions
    pub languages: LanguagePair,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Translation service configuration
    pub translation: TranslationConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Speech capture and playback configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT provider
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS provider
    pub tts_provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "eleven_multilingual_v2")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// Rate, pitch, and volume for playback
    pub params: VoiceParams,
}

/// Remote translation configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Translation service
    pub provider: TranslateProvider,

    /// Service URL override
    pub base_url: Option<String>,

    /// Request timeout
    pub timeout: Duration,

    /// Backend endpoint issuing short-lived translation tokens
    pub token_url: Option<String>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,

    /// Translation service API key
    pub translate: Option<SecretString>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn load() -> Result<Self> {
        Self::resolve(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn resolve(fc: VoxlateConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = |var: &str, file_value: Option<String>| {
            env(var)
                .or(file_value)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };

        let api_keys = ApiKeys {
            openai: secret("OPENAI_API_KEY", fc.api_keys.openai),
            deepgram: secret("DEEPGRAM_API_KEY", fc.api_keys.deepgram),
            elevenlabs: secret("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
            translate: secret("VOXLATE_TRANSLATE_KEY", fc.api_keys.translate),
        };

        let languages = LanguagePair::new(
            env("VOXLATE_FROM")
                .or(fc.languages.from)
                .unwrap_or_else(|| DEFAULT_FROM.to_string()),
            env("VOXLATE_TO")
                .or(fc.languages.to)
                .unwrap_or_else(|| DEFAULT_TO.to_string()),
        );

        // Voice config (env > toml > default)
        let stt_provider: SttProvider = env("VOXLATE_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .map_or(Ok(SttProvider::Whisper), |s| s.parse())?;
        let tts_provider: TtsProvider = env("VOXLATE_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .map_or(Ok(TtsProvider::OpenAI), |s| s.parse())?;

        let defaults = VoiceParams::default();
        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("VOXLATE_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model(stt_provider).to_string()),
            tts_provider,
            tts_model: env("VOXLATE_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model(tts_provider).to_string()),
            tts_voice: env("VOXLATE_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            params: VoiceParams::new(
                fc.voice.rate.unwrap_or(defaults.rate),
                fc.voice.pitch.unwrap_or(defaults.pitch),
                fc.voice.volume.unwrap_or(defaults.volume),
            ),
        };

        let translation = TranslationConfig {
            provider: env("VOXLATE_TRANSLATE_PROVIDER")
                .or(fc.translation.provider)
                .map_or(Ok(TranslateProvider::Google), |s| s.parse())?,
            base_url: env("VOXLATE_TRANSLATE_URL").or(fc.translation.base_url),
            timeout: fc
                .translation
                .timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            token_url: env("VOXLATE_TOKEN_URL").or(fc.translation.token_url),
        };

        Ok(Self {
            languages,
            voice,
            translation,
            api_keys,
        })
    }
}

const fn default_stt_model(provider: SttProvider) -> &'static str {
    match provider {
        SttProvider::Whisper => "whisper-1",
        SttProvider::Deepgram => "nova-2",
    }
}

const fn default_tts_model(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::OpenAI => "tts-1",
        TtsProvider::ElevenLabs => "eleven_multilingual_v2",
    }
}
