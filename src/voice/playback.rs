//! Audio playback to speakers

use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// How often the playback thread checks for completion or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time allowed past the nominal duration before giving up
const COMPLETION_GRACE: Duration = Duration::from_millis(500);

/// Let the device drain its last buffer before closing the stream
const DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Whether the default host exposes an output device
#[must_use]
pub fn output_available() -> bool {
    cpal::default_host().default_output_device().is_some()
}

/// Mono PCM decoded from synthesized speech
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Playback length
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
    config: StreamConfig,
}

impl AudioPlayback {
    /// Open the default output device at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCapability` if there is no output device, or
    /// `Synthesis` if it supports neither mono nor stereo at this rate
    pub fn open(sample_rate: u32) -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::UnsupportedCapability("no output device available".to_string()))?;

        let supports = |channels: u16| {
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        };

        let supported_config = supports(1)
            .or_else(|| supports(2))
            .ok_or_else(|| Error::Synthesis(format!("no output config for {sample_rate} Hz")))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio playback opened"
        );

        Ok(Self { device, config })
    }

    /// Play `samples` at `volume`, blocking until done or cancelled
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if `cancel` fires first, or `Synthesis` if the
    /// output stream fails or stalls
    pub fn play_blocking(
        &self,
        samples: Vec<f32>,
        volume: f32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let channels = usize::from(self.config.channels);
        let total = samples.len();
        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let gain = volume.clamp(0.0, 1.0);
        let stream_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let stream_error = Arc::clone(&stream_error);
            self.device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let pos = position.fetch_add(1, Ordering::Relaxed);
                            let sample = samples.get(pos).map_or(0.0, |s| s * gain);
                            frame.fill(sample);
                        }
                    },
                    move |err| {
                        tracing::error!(error = %err, "audio playback error");
                        let mut slot = stream_error.lock().unwrap_or_else(PoisonError::into_inner);
                        if slot.is_none() {
                            *slot = Some(err.to_string());
                        }
                    },
                    None,
                )
                .map_err(|e| Error::Synthesis(format!("cannot open speaker: {e}")))?
        };

        stream
            .play()
            .map_err(|e| Error::Synthesis(format!("cannot start speaker: {e}")))?;

        let nominal = Duration::from_millis(
            (total as u64 * 1000) / u64::from(self.config.sample_rate.0.max(1)),
        );
        let deadline = Instant::now() + nominal + COMPLETION_GRACE;

        let outcome = await_completion(&position, total, deadline, &stream_error, cancel);
        if outcome.is_ok() {
            std::thread::sleep(DRAIN_DELAY);
            tracing::debug!(samples = total, "playback complete");
        }
        drop(stream);

        outcome
    }
}

/// Block until the device has consumed `total` samples
///
/// Fails on cancellation, on a reported stream error, or when the device
/// stops consuming before `deadline`.
fn await_completion(
    position: &AtomicUsize,
    total: usize,
    deadline: Instant,
    stream_error: &Mutex<Option<String>>,
    cancel: &CancellationToken,
) -> Result<()> {
    loop {
        if let Some(err) = stream_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(Error::Synthesis(format!("speaker failed: {err}")));
        }
        if position.load(Ordering::Relaxed) >= total {
            return Ok(());
        }
        if cancel.is_cancelled() {
            tracing::debug!("playback cancelled");
            return Err(Error::Cancelled);
        }
        if Instant::now() > deadline {
            tracing::warn!(
                played = position.load(Ordering::Relaxed),
                total,
                "speaker stalled before playback finished"
            );
            return Err(Error::Synthesis("speaker stalled during playback".to_string()));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns `Synthesis` if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut audio = DecodedAudio::default();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if audio.sample_rate == 0 {
                    audio.sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                }

                if frame.channels == 2 {
                    // Average stereo down to mono
                    audio.samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    audio
                        .samples
                        .extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Synthesis(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(audio)
}
