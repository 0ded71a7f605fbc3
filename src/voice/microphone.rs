//! Speech capture from the default microphone through a remote STT service

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::capture::{AudioCapture, SAMPLE_RATE, input_available, samples_to_wav};
use super::endpoint::{EndpointDetector, EndpointState};
use super::stt::SpeechToText;
use crate::capability::{SpeechCapture, UtteranceResult};
use crate::{Error, Result};

/// How often the recording thread drains the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Records one utterance and transcribes it
pub struct MicrophoneCapture {
    stt: SpeechToText,
    available: bool,
}

impl MicrophoneCapture {
    /// Wrap an STT client; input device presence is checked once here
    #[must_use]
    pub fn new(stt: SpeechToText) -> Self {
        let available = input_available();
        if !available {
            tracing::warn!("no input device, speech capture unavailable");
        }
        Self { stt, available }
    }
}

#[async_trait]
impl SpeechCapture for MicrophoneCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<UtteranceResult> {
        if !self.available {
            return Err(Error::UnsupportedCapability(
                "speech recognition".to_string(),
            ));
        }

        // cpal streams are not Send; record on a blocking thread
        let recorder_cancel = cancel.clone();
        let samples = tokio::task::spawn_blocking(move || record_utterance(&recorder_cancel))
            .await
            .map_err(|e| Error::Recognition(format!("recording task failed: {e}")))??;

        if samples.is_empty() {
            return Ok(UtteranceResult::new("", 0.0, language));
        }

        let wav = samples_to_wav(&samples, SAMPLE_RATE)
            .map_err(|e| Error::Recognition(e.to_string()))?;

        let transcript = tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.stt.transcribe(&wav, language) => result?,
        };

        Ok(UtteranceResult::new(
            transcript.text,
            transcript.confidence,
            language,
        ))
    }
}

/// Record from the default input until the utterance ends
///
/// Returns no samples when nobody spoke before the timeout.
fn record_utterance(cancel: &CancellationToken) -> Result<Vec<f32>> {
    let mut capture = AudioCapture::open()?;
    let mut detector = EndpointDetector::new(SAMPLE_RATE);

    capture.start()?;
    tracing::debug!("recording utterance");

    loop {
        if cancel.is_cancelled() {
            capture.stop();
            return Err(Error::Cancelled);
        }

        std::thread::sleep(POLL_INTERVAL);

        let chunk = capture.take_buffer();
        if chunk.is_empty() {
            continue;
        }

        match detector.process(&chunk) {
            EndpointState::Complete => {
                capture.stop();
                return Ok(detector.take_utterance());
            }
            EndpointState::TimedOut => {
                capture.stop();
                return Ok(Vec::new());
            }
            EndpointState::Waiting | EndpointState::Speaking => {}
        }
    }
}
