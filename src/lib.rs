//! voxlate - speak, translate, hear
//!
//! This library provides a voice translation loop:
//! - Single-shot speech capture (microphone + remote STT)
//! - Remote text translation that degrades instead of failing
//! - Speech playback (remote TTS + speaker)
//! - An orchestrator sequencing the three for one session at a time
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               Presentation (CLI, UI)                 │
//! │     start / stop / translate_text · status · history │
//! └────────────────────┬────────────────────────────────┘
//!                      │ SessionObserver callbacks
//! ┌────────────────────▼────────────────────────────────┐
//! │             TranslationOrchestrator                  │
//! │   Idle → Listening → Translating → Speaking → Idle   │
//! └──────┬──────────────────┬────────────────────┬──────┘
//!        │                  │                    │
//! ┌──────▼──────┐   ┌───────▼───────┐   ┌────────▼───────┐
//! │SpeechCapture│   │  Translator   │   │ SpeechPlayback │
//! │ mic + STT   │   │ HTTP (+creds) │   │ TTS + speaker  │
//! └─────────────┘   └───────────────┘   └────────────────┘
//! ```

pub mod capability;
pub mod config;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod runtime;
pub mod translate;
pub mod voice;

pub use capability::{
    CapabilityReport, SpeechCapture, SpeechPlayback, TranslationResult, Translator,
    UtteranceResult, VoiceParams,
};
pub use config::Config;
pub use credentials::{BackendTokenProvider, CredentialProvider, StaticCredential};
pub use error::{Error, Result};
pub use orchestrator::{
    LanguagePair, NoopObserver, SessionObserver, SessionOutcome, SessionState, SessionStatus,
    TranslationOrchestrator, TranslationSessionResult,
};
pub use translate::{HttpTranslator, TranslateProvider, TranslationRequest, translate_batch};
