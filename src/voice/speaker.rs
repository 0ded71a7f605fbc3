//! Speech playback through a remote TTS service and the default speaker

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::playback::{AudioPlayback, decode_mp3, output_available};
use super::tts::TextToSpeech;
use crate::capability::{SpeechPlayback, VoiceParams};
use crate::{Error, Result};

/// Synthesizes text remotely and plays it locally
pub struct SpeakerPlayback {
    tts: TextToSpeech,
    available: bool,
}

impl SpeakerPlayback {
    /// Wrap a TTS client; output device presence is checked once here
    #[must_use]
    pub fn new(tts: TextToSpeech) -> Self {
        let available = output_available();
        if !available {
            tracing::warn!("no output device, speech playback unavailable");
        }
        Self { tts, available }
    }
}

#[async_trait]
impl SpeechPlayback for SpeakerPlayback {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn speak(
        &self,
        text: &str,
        language: &str,
        voice: &VoiceParams,
        cancel: CancellationToken,
    ) -> Result<()> {
        if !self.available {
            return Err(Error::UnsupportedCapability("speech synthesis".to_string()));
        }

        if (voice.pitch - 1.0).abs() > f32::EPSILON {
            tracing::debug!(pitch = voice.pitch, "remote TTS has no pitch control, ignoring");
        }

        tracing::debug!(text, language, "speaking");

        let mp3 = tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.tts.synthesize(text, language, voice.rate) => result?,
        };

        let audio = decode_mp3(&mp3)?;
        if audio.samples.is_empty() {
            return Err(Error::Synthesis("synthesized audio was empty".to_string()));
        }

        let volume = voice.volume;
        let player_cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            AudioPlayback::open(audio.sample_rate)?.play_blocking(audio.samples, volume, &player_cancel)
        })
        .await
        .map_err(|e| Error::Synthesis(format!("playback task failed: {e}")))?
    }
}
