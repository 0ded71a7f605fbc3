//! Capability interfaces the orchestrator depends on
//!
//! Speech capture, translation, and speech playback are injected into the
//! orchestrator as trait objects. Platform adapters live in [`crate::voice`]
//! and [`crate::translate`]; tests substitute scripted doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Clamp a confidence score into `[0, 1]`, mapping NaN to zero
#[must_use]
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// One recognized spoken phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtteranceResult {
    /// Recognized text
    pub text: String,
    /// Recognition confidence in `[0, 1]`
    pub confidence: f32,
    /// Language tag the utterance was recognized in
    pub language: String,
}

impl UtteranceResult {
    /// Create an utterance, clamping confidence into range
    #[must_use]
    pub fn new(text: impl Into<String>, confidence: f32, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_confidence(confidence),
            language: language.into(),
        }
    }

    /// Whether the transcript carries no words
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Output of a single translation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Translated text
    pub translated_text: String,
    /// Translation confidence in `[0, 1]`
    pub confidence: f32,
}

impl TranslationResult {
    /// Create a translation result, clamping confidence into range
    #[must_use]
    pub fn new(translated_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            translated_text: translated_text.into(),
            confidence: clamp_confidence(confidence),
        }
    }

    /// Echo the source text back at zero confidence
    #[must_use]
    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            translated_text: text.into(),
            confidence: 0.0,
        }
    }

    /// Whether this result is a degraded echo of the input
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.confidence <= 0.0
    }
}

/// Synthesis parameters handed to speech playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    /// Speaking rate multiplier (0.25 to 4.0)
    pub rate: f32,
    /// Pitch multiplier (0.0 to 2.0)
    pub pitch: f32,
    /// Output volume (0.0 to 1.0)
    pub volume: f32,
}

impl VoiceParams {
    /// Create voice parameters, clamping each into its supported range
    #[must_use]
    pub fn new(rate: f32, pitch: f32, volume: f32) -> Self {
        Self {
            rate: rate.clamp(0.25, 4.0),
            pitch: pitch.clamp(0.0, 2.0),
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Which device capabilities are present, queried once per orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    /// A speech recognition engine is available
    pub speech_capture: bool,
    /// A speech synthesis engine is available
    pub speech_playback: bool,
}

/// Single-shot speech recognition
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Whether the platform offers a recognition engine at all
    fn is_available(&self) -> bool {
        true
    }

    /// Listen for one utterance in `language`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCapability` when no engine exists, `Recognition`
    /// on device, permission, or network failure, and `Cancelled` when
    /// `cancel` fires before an utterance is produced
    async fn recognize(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<UtteranceResult>;
}

/// Text translation
///
/// Implementations never fail: on any remote problem they return
/// [`TranslationResult::degraded`] so the pipeline can still speak.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `from` to `to`
    async fn translate(&self, text: &str, from: &str, to: &str) -> TranslationResult;
}

/// Speech synthesis and playback
#[async_trait]
pub trait SpeechPlayback: Send + Sync {
    /// Whether the platform offers a synthesis engine at all
    fn is_available(&self) -> bool {
        true
    }

    /// Speak `text` in `language` to completion
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCapability` when no engine exists, `Synthesis`
    /// when synthesis or playback fails, and `Cancelled` when `cancel`
    /// fires before playback completes
    async fn speak(
        &self,
        text: &str,
        language: &str,
        voice: &VoiceParams,
        cancel: CancellationToken,
    ) -> Result<()>;
}
