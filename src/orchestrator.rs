//! Voice translation orchestrator
//!
//! Drives one listen → translate → speak session at a time:
//!
//! ```text
//!   Idle ──start_listening──▶ Listening ──transcript──▶ Translating ──▶ Speaking ──▶ Idle
//!    ▲                           │  (blank) ──▶ Idle          ▲                │
//!    └──── Error ◀── capture / playback failure       translate_text          stop_speaking ──▶ Idle
//! ```
//!
//! State lives behind a mutex and every transition is guarded by the state it
//! leaves and by the run it belongs to. Cancelling a stage bumps the run
//! counter, so a cancelled pipeline can never transition state or fire
//! callbacks again. Dropping a run's future mid-flight cancels it the same way.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::capability::{
    CapabilityReport, SpeechCapture, SpeechPlayback, Translator, VoiceParams,
};
use crate::Error;

/// Confidence assigned to caller-supplied text on the direct path
const TYPED_TEXT_CONFIDENCE: f32 = 1.0;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No operation in flight
    Idle,
    /// Speech capture in progress
    Listening,
    /// Translation request in flight
    Translating,
    /// Playback in progress
    Speaking,
    /// A stage failed; reported and immediately left for `Idle`
    Error,
}

impl SessionState {
    /// Whether a pipeline stage is running
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Listening | Self::Translating | Self::Speaking)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Translating => "translating",
            Self::Speaking => "speaking",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Status flags for a presentation layer; at most one is set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub is_listening: bool,
    pub is_translating: bool,
    pub is_speaking: bool,
}

impl From<SessionState> for SessionStatus {
    fn from(state: SessionState) -> Self {
        Self {
            is_listening: state == SessionState::Listening,
            is_translating: state == SessionState::Translating,
            is_speaking: state == SessionState::Speaking,
        }
    }
}

/// Source and target language tags (e.g. `en-US`, `es-ES`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub from: String,
    pub to: String,
}

impl LanguagePair {
    /// Create a language pair
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The same pair with source and target exchanged
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

/// Terminal product of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSessionResult {
    pub original_text: String,
    pub translated_text: String,
    pub from_language: String,
    pub to_language: String,
    /// Minimum of capture and translation confidence
    pub confidence: f32,
}

/// How a call into the orchestrator ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Pipeline ran to completion
    Completed(TranslationSessionResult),
    /// Nothing was recognized; translation and playback were skipped
    Empty,
    /// A stop call cancelled the run
    Cancelled,
    /// Capture or playback failed with the given reason
    Failed(String),
    /// Another run was already in flight; nothing happened
    Rejected,
}

/// Receives status transitions, results, and errors
///
/// Callbacks run while the session lock is held so they are delivered in
/// transition order. They must not call back into the orchestrator.
pub trait SessionObserver: Send + Sync {
    /// The orchestrator entered `state`
    fn on_status(&self, _state: SessionState) {}

    /// A session completed
    fn on_result(&self, _result: &TranslationSessionResult) {}

    /// Capture or playback failed
    fn on_error(&self, _reason: &str) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Mutable session state
struct Inner {
    state: SessionState,
    run: u64,
    cancel: Option<CancellationToken>,
    languages: LanguagePair,
    voice: VoiceParams,
}

/// Snapshot handed to one pipeline run
struct Run {
    id: u64,
    cancel: CancellationToken,
    languages: LanguagePair,
    voice: VoiceParams,
}

/// Releases the session if a run's future is dropped before it finishes
struct RunGuard<'a> {
    orchestrator: &'a TranslationOrchestrator,
    run: u64,
}

impl<'a> RunGuard<'a> {
    const fn new(orchestrator: &'a TranslationOrchestrator, run: &Run) -> Self {
        Self {
            orchestrator,
            run: run.id,
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.abandon(self.run);
    }
}

/// Sequences speech capture, translation, and playback for one session
pub struct TranslationOrchestrator {
    capture: Arc<dyn SpeechCapture>,
    translator: Arc<dyn Translator>,
    playback: Arc<dyn SpeechPlayback>,
    observer: Arc<dyn SessionObserver>,
    capabilities: CapabilityReport,
    inner: Mutex<Inner>,
}

impl TranslationOrchestrator {
    /// Create an orchestrator, querying capability availability once
    #[must_use]
    pub fn new(
        capture: Arc<dyn SpeechCapture>,
        translator: Arc<dyn Translator>,
        playback: Arc<dyn SpeechPlayback>,
        languages: LanguagePair,
    ) -> Self {
        let capabilities = CapabilityReport {
            speech_capture: capture.is_available(),
            speech_playback: playback.is_available(),
        };

        tracing::debug!(
            speech_capture = capabilities.speech_capture,
            speech_playback = capabilities.speech_playback,
            from = %languages.from,
            to = %languages.to,
            "orchestrator initialized"
        );

        Self {
            capture,
            translator,
            playback,
            observer: Arc::new(NoopObserver),
            capabilities,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                run: 0,
                cancel: None,
                languages,
                voice: VoiceParams::default(),
            }),
        }
    }

    /// Attach an observer for status, result, and error callbacks
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the voice parameters used for playback
    #[must_use]
    pub fn with_voice(self, voice: VoiceParams) -> Self {
        self.lock().voice = voice;
        self
    }

    /// Capabilities detected at construction
    #[must_use]
    pub const fn capabilities(&self) -> CapabilityReport {
        self.capabilities
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Current status flags
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.state().into()
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.status().is_listening
    }

    #[must_use]
    pub fn is_translating(&self) -> bool {
        self.status().is_translating
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.status().is_speaking
    }

    /// Configured language pair
    #[must_use]
    pub fn languages(&self) -> LanguagePair {
        self.lock().languages.clone()
    }

    /// Change the language pair; takes effect on the next run
    pub fn set_languages(&self, languages: LanguagePair) {
        self.lock().languages = languages;
    }

    /// Exchange source and target languages; takes effect on the next run
    pub fn swap_languages(&self) -> LanguagePair {
        let mut inner = self.lock();
        inner.languages = inner.languages.swapped();
        inner.languages.clone()
    }

    /// Configured voice parameters
    #[must_use]
    pub fn voice(&self) -> VoiceParams {
        self.lock().voice
    }

    /// Change the voice parameters; takes effect on the next run
    pub fn set_voice(&self, voice: VoiceParams) {
        self.lock().voice = voice;
    }

    /// Listen, translate, and speak back
    ///
    /// Rejected without any effect unless the orchestrator is idle.
    pub async fn start_listening(&self) -> SessionOutcome {
        let run = match self.begin(SessionState::Listening) {
            Ok(run) => run,
            Err(outcome) => return outcome,
        };

        let _guard = RunGuard::new(self, &run);
        let span = tracing::info_span!("session", id = %Uuid::new_v4(), path = "voice");
        self.run_voice(run).instrument(span).await
    }

    /// Translate and speak caller-supplied text, skipping capture
    ///
    /// Blank text returns [`SessionOutcome::Empty`] without touching state.
    pub async fn translate_text(&self, text: &str) -> SessionOutcome {
        if text.trim().is_empty() {
            return SessionOutcome::Empty;
        }

        let run = match self.begin(SessionState::Translating) {
            Ok(run) => run,
            Err(outcome) => return outcome,
        };

        let _guard = RunGuard::new(self, &run);
        let span = tracing::info_span!("session", id = %Uuid::new_v4(), path = "text");
        self.translate_and_speak(run, text.to_string(), TYPED_TEXT_CONFIDENCE)
            .instrument(span)
            .await
    }

    /// Cancel an in-flight capture
    ///
    /// Returns `false` and does nothing unless the orchestrator is listening.
    pub fn stop_listening(&self) -> bool {
        self.cancel_stage(SessionState::Listening)
    }

    /// Cancel in-flight playback; no result is delivered
    ///
    /// Returns `false` and does nothing unless the orchestrator is speaking.
    pub fn stop_speaking(&self) -> bool {
        self.cancel_stage(SessionState::Speaking)
    }

    async fn run_voice(&self, run: Run) -> SessionOutcome {
        tracing::debug!(language = %run.languages.from, "listening");

        let recognized = tokio::select! {
            biased;
            () = run.cancel.cancelled() => return SessionOutcome::Cancelled,
            result = self.capture.recognize(&run.languages.from, run.cancel.clone()) => result,
        };

        let utterance = match recognized {
            Ok(utterance) => utterance,
            Err(Error::Cancelled) => {
                self.advance(&run, SessionState::Listening, SessionState::Idle);
                return SessionOutcome::Cancelled;
            }
            Err(e) => return self.fail(&run, SessionState::Listening, &e),
        };

        if utterance.is_blank() {
            tracing::debug!("empty transcript, nothing to translate");
            return if self.advance(&run, SessionState::Listening, SessionState::Idle) {
                SessionOutcome::Empty
            } else {
                SessionOutcome::Cancelled
            };
        }

        tracing::info!(
            transcript = %utterance.text,
            confidence = utterance.confidence,
            "utterance recognized"
        );

        if !self.advance(&run, SessionState::Listening, SessionState::Translating) {
            return SessionOutcome::Cancelled;
        }

        self.translate_and_speak(run, utterance.text, utterance.confidence)
            .await
    }

    async fn translate_and_speak(
        &self,
        run: Run,
        text: String,
        capture_confidence: f32,
    ) -> SessionOutcome {
        let LanguagePair { from, to } = &run.languages;

        // Not cancellable: always runs to completion once started
        let translation = self.translator.translate(&text, from, to).await;
        if translation.is_degraded() {
            tracing::warn!(from = %from, to = %to, "translation degraded, speaking original text");
        } else {
            tracing::info!(
                translated = %translation.translated_text,
                confidence = translation.confidence,
                "translation complete"
            );
        }

        if !self.capabilities.speech_playback {
            let error = Error::UnsupportedCapability("speech playback".to_string());
            return self.fail(&run, SessionState::Translating, &error);
        }

        if !self.advance(&run, SessionState::Translating, SessionState::Speaking) {
            return SessionOutcome::Cancelled;
        }

        let spoken = tokio::select! {
            biased;
            () = run.cancel.cancelled() => return SessionOutcome::Cancelled,
            result = self.playback.speak(
                &translation.translated_text,
                to,
                &run.voice,
                run.cancel.clone(),
            ) => result,
        };

        match spoken {
            Ok(()) => {
                let result = TranslationSessionResult {
                    confidence: capture_confidence.min(translation.confidence),
                    original_text: text,
                    translated_text: translation.translated_text,
                    from_language: from.clone(),
                    to_language: to.clone(),
                };
                if self.complete(&run, &result) {
                    SessionOutcome::Completed(result)
                } else {
                    SessionOutcome::Cancelled
                }
            }
            Err(Error::Cancelled) => {
                self.advance(&run, SessionState::Speaking, SessionState::Idle);
                SessionOutcome::Cancelled
            }
            Err(e) => self.fail(&run, SessionState::Speaking, &e),
        }
    }

    /// Claim the session for a new run entering at `entry`
    fn begin(&self, entry: SessionState) -> Result<Run, SessionOutcome> {
        let mut inner = self.lock();

        if inner.state != SessionState::Idle {
            tracing::debug!(state = %inner.state, "session busy, ignoring start");
            return Err(SessionOutcome::Rejected);
        }

        if entry == SessionState::Listening && !self.capabilities.speech_capture {
            let error = Error::UnsupportedCapability("speech recognition".to_string());
            tracing::warn!(error = %error, "cannot start listening");
            let reason = error.to_string();
            self.observer.on_error(&reason);
            return Err(SessionOutcome::Failed(reason));
        }

        inner.run = inner.run.wrapping_add(1);
        let cancel = CancellationToken::new();
        inner.cancel = Some(cancel.clone());
        inner.state = entry;
        self.observer.on_status(entry);

        Ok(Run {
            id: inner.run,
            cancel,
            languages: inner.languages.clone(),
            voice: inner.voice,
        })
    }

    /// Move `from` → `to` if `run` still owns the session in `from`
    fn advance(&self, run: &Run, from: SessionState, to: SessionState) -> bool {
        let mut inner = self.lock();
        if !Self::owns(&inner, run, from) {
            return false;
        }

        tracing::debug!(from = %from, to = %to, "state transition");
        inner.state = to;
        if to == SessionState::Idle {
            inner.cancel = None;
        }
        self.observer.on_status(to);
        true
    }

    /// Finish a run: `Speaking` → `Idle` plus the result callback
    fn complete(&self, run: &Run, result: &TranslationSessionResult) -> bool {
        let mut inner = self.lock();
        if !Self::owns(&inner, run, SessionState::Speaking) {
            return false;
        }

        inner.state = SessionState::Idle;
        inner.cancel = None;
        self.observer.on_status(SessionState::Idle);
        self.observer.on_result(result);
        tracing::info!(confidence = result.confidence, "session complete");
        true
    }

    /// Report a stage failure: `from` → `Error` → `Idle`
    fn fail(&self, run: &Run, from: SessionState, error: &Error) -> SessionOutcome {
        let mut inner = self.lock();
        if !Self::owns(&inner, run, from) {
            return SessionOutcome::Cancelled;
        }

        let reason = error.to_string();
        tracing::warn!(stage = %from, error = %reason, "session failed");

        inner.state = SessionState::Error;
        self.observer.on_status(SessionState::Error);
        self.observer.on_error(&reason);

        inner.state = SessionState::Idle;
        inner.cancel = None;
        self.observer.on_status(SessionState::Idle);

        SessionOutcome::Failed(reason)
    }

    /// Return to `Idle` if `run` is still in flight when its caller goes away
    fn abandon(&self, run: u64) {
        let mut inner = self.lock();
        if inner.run != run || inner.state == SessionState::Idle {
            return;
        }

        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        inner.run = inner.run.wrapping_add(1);
        tracing::warn!(state = %inner.state, "session dropped mid-run, returning to idle");
        inner.state = SessionState::Idle;
        self.observer.on_status(SessionState::Idle);
    }

    fn cancel_stage(&self, stage: SessionState) -> bool {
        let mut inner = self.lock();
        if inner.state != stage {
            tracing::debug!(state = %inner.state, requested = %stage, "nothing to stop");
            return false;
        }

        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        inner.run = inner.run.wrapping_add(1);
        inner.state = SessionState::Idle;
        tracing::info!(stage = %stage, "stage cancelled");
        self.observer.on_status(SessionState::Idle);
        true
    }

    fn owns(inner: &Inner, run: &Run, state: SessionState) -> bool {
        inner.run == run.id && inner.state == state
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
