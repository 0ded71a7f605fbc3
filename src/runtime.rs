//! Wires configured adapters into an orchestrator

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use crate::capability::{SpeechCapture, SpeechPlayback, UtteranceResult, VoiceParams};
use crate::config::Config;
use crate::credentials::{BackendTokenProvider, CredentialProvider, StaticCredential};
use crate::orchestrator::{SessionObserver, TranslationOrchestrator};
use crate::translate::{HttpTranslator, TranslateProvider};
use crate::voice::{
    MicrophoneCapture, SpeakerPlayback, SpeechToText, SttProvider, TextToSpeech, TtsProvider,
};
use crate::{Error, Result};

/// Resolve where the translation credential comes from
///
/// A backend token URL takes precedence over a locally configured key.
///
/// # Errors
///
/// Returns error if the configured key is empty
pub fn credential_provider(config: &Config) -> Result<Option<Arc<dyn CredentialProvider>>> {
    if let Some(url) = &config.translation.token_url {
        tracing::debug!(url = %url, "using backend-issued translation tokens");
        return Ok(Some(Arc::new(BackendTokenProvider::new(url.clone()))));
    }

    config
        .api_keys
        .translate
        .clone()
        .map(|key| StaticCredential::new(key).map(|c| Arc::new(c) as Arc<dyn CredentialProvider>))
        .transpose()
}

/// Build the configured remote translator
///
/// Google without a credential still builds; its requests degrade.
///
/// # Errors
///
/// Returns error if the configured key is empty or the HTTP client cannot be built
pub fn build_translator(config: &Config) -> Result<HttpTranslator> {
    let credentials = credential_provider(config)?;
    let translator = HttpTranslator::new(
        config.translation.provider,
        credentials,
        config.translation.timeout,
    )?;

    Ok(match &config.translation.base_url {
        Some(url) => translator.with_base_url(url.clone()),
        None => translator,
    })
}

/// Build microphone capture with the configured STT service
///
/// # Errors
///
/// Returns error if the provider's API key is missing
pub fn build_capture(config: &Config) -> Result<MicrophoneCapture> {
    let provider = config.voice.stt_provider;
    let key = match provider {
        SttProvider::Whisper => required_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
        SttProvider::Deepgram => {
            required_key(config.api_keys.deepgram.as_ref(), "DEEPGRAM_API_KEY")?
        }
    };

    let stt = SpeechToText::new(provider, key, config.voice.stt_model.clone())?;
    Ok(MicrophoneCapture::new(stt))
}

/// Build speaker playback with the configured TTS service
///
/// # Errors
///
/// Returns error if the provider's API key is missing
pub fn build_playback(config: &Config) -> Result<SpeakerPlayback> {
    let provider = config.voice.tts_provider;
    let key = match provider {
        TtsProvider::OpenAI => required_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
        TtsProvider::ElevenLabs => {
            required_key(config.api_keys.elevenlabs.as_ref(), "ELEVENLABS_API_KEY")?
        }
    };

    let tts = TextToSpeech::new(
        provider,
        key,
        config.voice.tts_voice.clone(),
        config.voice.tts_model.clone(),
    )?;
    Ok(SpeakerPlayback::new(tts))
}

/// Build an orchestrator from configuration
///
/// A voice adapter whose API key is missing is reported as an unavailable
/// capability rather than failing the whole orchestrator.
///
/// # Errors
///
/// Returns error if the translator cannot be configured
pub fn build_orchestrator(
    config: &Config,
    observer: Arc<dyn SessionObserver>,
) -> Result<TranslationOrchestrator> {
    let translator = build_translator(config)?;

    let capture: Arc<dyn SpeechCapture> = match build_capture(config) {
        Ok(capture) => Arc::new(capture),
        Err(e) => {
            tracing::warn!(error = %e, "speech capture disabled");
            Arc::new(Unconfigured("speech recognition"))
        }
    };
    let playback: Arc<dyn SpeechPlayback> = match build_playback(config) {
        Ok(playback) => Arc::new(playback),
        Err(e) => {
            tracing::warn!(error = %e, "speech playback disabled");
            Arc::new(Unconfigured("speech synthesis"))
        }
    };

    tracing::info!(
        from = %config.languages.from,
        to = %config.languages.to,
        translator = ?config.translation.provider,
        stt = ?config.voice.stt_provider,
        tts = ?config.voice.tts_provider,
        "orchestrator assembled"
    );

    Ok(TranslationOrchestrator::new(
        capture,
        Arc::new(translator),
        playback,
        config.languages.clone(),
    )
    .with_voice(config.voice.params)
    .with_observer(observer))
}

/// Whether translation needs a credential the config does not provide
#[must_use]
pub fn missing_translation_credential(config: &Config) -> bool {
    config.translation.provider == TranslateProvider::Google
        && config.translation.token_url.is_none()
        && config.api_keys.translate.is_none()
}

/// Voice adapter standing in for a service with no API key
struct Unconfigured(&'static str);

#[async_trait]
impl SpeechCapture for Unconfigured {
    fn is_available(&self) -> bool {
        false
    }

    async fn recognize(
        &self,
        _language: &str,
        _cancel: CancellationToken,
    ) -> Result<UtteranceResult> {
        Err(Error::UnsupportedCapability(format!("{} not configured", self.0)))
    }
}

#[async_trait]
impl SpeechPlayback for Unconfigured {
    fn is_available(&self) -> bool {
        false
    }

    async fn speak(
        &self,
        _text: &str,
        _language: &str,
        _voice: &VoiceParams,
        _cancel: CancellationToken,
    ) -> Result<()> {
        Err(Error::UnsupportedCapability(format!("{} not configured", self.0)))
    }
}

fn required_key(key: Option<&SecretString>, var: &str) -> Result<SecretString> {
    key.cloned()
        .ok_or_else(|| Error::Config(format!("{var} is required")))
}
