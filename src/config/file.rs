//! TOML configuration file loading
//!
//! Supports `~/.config/voxlate/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoxlateConfigFile {
    /// Default language pair
    #[serde(default)]
    pub languages: LanguagesFileConfig,

    /// Speech capture and playback configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Remote translation configuration
    #[serde(default)]
    pub translation: TranslationFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Language pair configuration
#[derive(Debug, Default, Deserialize)]
pub struct LanguagesFileConfig {
    /// Source language tag (e.g. "en-US")
    pub from: Option<String>,

    /// Target language tag (e.g. "es-ES")
    pub to: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// Speaking rate multiplier
    pub rate: Option<f32>,

    /// Pitch multiplier
    pub pitch: Option<f32>,

    /// Output volume
    pub volume: Option<f32>,
}

/// Translation service configuration
#[derive(Debug, Default, Deserialize)]
pub struct TranslationFileConfig {
    /// Provider ("google" or "libretranslate")
    pub provider: Option<String>,

    /// Override the provider's service URL
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Backend endpoint issuing short-lived translation tokens
    pub token_url: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
    pub translate: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoxlateConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoxlateConfigFile {
    config_file_path().map_or_else(VoxlateConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> VoxlateConfigFile {
    if !path.exists() {
        return VoxlateConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoxlateConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoxlateConfigFile::default()
        }
    }
}

/// Return the config file path
///
/// `VOXLATE_CONFIG` wins; otherwise `~/.config/voxlate/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("VOXLATE_CONFIG") {
        return Some(PathBuf::from(path));
    }

    directories::BaseDirs::new().map(|d| d.config_dir().join("voxlate").join("config.toml"))
}
