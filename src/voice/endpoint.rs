//! Utterance endpointing
//!
//! Decides when a single-shot listen is over: speech followed by enough
//! silence, a maximum utterance length, or no speech at all before a timeout.
//! Energy-based; good enough to bound a push-to-talk recording.

/// Minimum RMS energy to consider a chunk speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech before trailing silence can end the utterance (seconds)
const MIN_SPEECH_SECS: f32 = 0.3;

/// Trailing silence that ends the utterance (seconds)
const END_SILENCE_SECS: f32 = 0.8;

/// Hard cap on utterance length (seconds)
const MAX_UTTERANCE_SECS: f32 = 15.0;

/// Give up if no speech starts within this time (seconds)
const NO_SPEECH_TIMEOUT_SECS: f32 = 5.0;

/// Where the detector is within one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// No speech yet
    Waiting,
    /// Speech started, accumulating
    Speaking,
    /// Utterance finished
    Complete,
    /// Nobody spoke before the timeout
    TimedOut,
}

/// Sample-count thresholds derived from the sample rate
#[derive(Debug, Clone, Copy)]
struct Limits {
    min_speech: usize,
    end_silence: usize,
    max_utterance: usize,
    no_speech_timeout: usize,
}

impl Limits {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn for_rate(sample_rate: u32) -> Self {
        let samples = |secs: f32| (sample_rate as f32 * secs) as usize;
        Self {
            min_speech: samples(MIN_SPEECH_SECS),
            end_silence: samples(END_SILENCE_SECS),
            max_utterance: samples(MAX_UTTERANCE_SECS),
            no_speech_timeout: samples(NO_SPEECH_TIMEOUT_SECS),
        }
    }
}

/// Detects the end of one spoken utterance
pub struct EndpointDetector {
    limits: Limits,
    state: EndpointState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    waited: usize,
}

impl EndpointDetector {
    /// Create a detector for audio at `sample_rate`
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            limits: Limits::for_rate(sample_rate),
            state: EndpointState::Waiting,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            waited: 0,
        }
    }

    /// Feed a chunk of samples and return the resulting state
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.limits.no_speech_timeout {
                        tracing::debug!("no speech before timeout");
                        self.state = EndpointState::TimedOut;
                    }
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.speech_buffer.len() >= self.limits.max_utterance {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance hit max length");
                    self.state = EndpointState::Complete;
                } else if self.silence_counter >= self.limits.end_silence {
                    if self.speech_buffer.len() > self.limits.min_speech + self.silence_counter {
                        tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                        self.state = EndpointState::Complete;
                    } else {
                        // Too short to be speech; keep waiting
                        tracing::trace!("discarding blip");
                        self.speech_buffer.clear();
                        self.silence_counter = 0;
                        self.state = EndpointState::Waiting;
                    }
                }
            }
            EndpointState::Complete | EndpointState::TimedOut => {}
        }

        self.state
    }

    /// Take the accumulated utterance, clearing it
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }

    /// Whether the utterance is over, with or without speech
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, EndpointState::Complete | EndpointState::TimedOut)
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Reset for a new utterance
    pub fn reset(&mut self) {
        self.state = EndpointState::Waiting;
        self.speech_buffer.clear();
        self.silence_counter = 0;
        self.waited = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
