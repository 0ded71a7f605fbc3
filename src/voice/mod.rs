//! Voice processing module
//!
//! Device-backed capability adapters: microphone capture with utterance
//! endpointing and remote STT, and remote TTS with local speaker playback.

mod capture;
mod endpoint;
mod microphone;
mod playback;
mod speaker;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, input_available, samples_to_wav};
pub use endpoint::{EndpointDetector, EndpointState, calculate_energy};
pub use microphone::MicrophoneCapture;
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3, output_available};
pub use speaker::SpeakerPlayback;
pub use stt::{SpeechToText, SttProvider, Transcript};
pub use tts::{TextToSpeech, TtsProvider};
