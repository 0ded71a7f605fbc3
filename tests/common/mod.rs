//! Shared test utilities
//!
//! Scripted capability doubles so the orchestrator can be driven without
//! audio hardware or network access.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use voxlate::{
    Error, LanguagePair, Result, SessionObserver, SessionState, SpeechCapture, SpeechPlayback,
    TranslationOrchestrator, TranslationResult, TranslationSessionResult, Translator,
    UtteranceResult, VoiceParams,
};

/// How a scripted capture behaves when asked to recognize
#[derive(Clone)]
pub enum CaptureScript {
    /// Return this transcript and confidence
    Utterance(&'static str, f32),
    /// Fail with a recognition error
    Fail(&'static str),
    /// Block until cancelled, then report `Cancelled`
    UntilCancelled,
    /// Ignore cancellation and return a transcript after a delay
    Delayed(&'static str, f32, Duration),
}

/// Speech capture double
pub struct ScriptedCapture {
    script: CaptureScript,
    available: bool,
    pub calls: AtomicUsize,
}

impl ScriptedCapture {
    pub fn new(script: CaptureScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            available: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            script: CaptureScript::UntilCancelled,
            available: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechCapture for ScriptedCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<UtteranceResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.clone() {
            CaptureScript::Utterance(text, confidence) => {
                Ok(UtteranceResult::new(text, confidence, language))
            }
            CaptureScript::Fail(reason) => Err(Error::Recognition(reason.to_string())),
            CaptureScript::UntilCancelled => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            CaptureScript::Delayed(text, confidence, delay) => {
                tokio::time::sleep(delay).await;
                Ok(UtteranceResult::new(text, confidence, language))
            }
        }
    }
}

/// Translator double answering from a fixed table
pub struct ScriptedTranslator {
    table: Vec<(&'static str, &'static str, f32)>,
    delays: Vec<(&'static str, Duration)>,
    pub calls: AtomicUsize,
}

impl ScriptedTranslator {
    pub fn new(table: &[(&'static str, &'static str, f32)]) -> Arc<Self> {
        Arc::new(Self {
            table: table.to_vec(),
            delays: Vec::new(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Delay the answer for `text` so completions arrive out of order
    pub fn with_delays(
        table: &[(&'static str, &'static str, f32)],
        delays: &[(&'static str, Duration)],
    ) -> Arc<Self> {
        Arc::new(Self {
            table: table.to_vec(),
            delays: delays.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, text: &str, _from: &str, _to: &str) -> TranslationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, delay)) = self.delays.iter().find(|(t, _)| *t == text) {
            tokio::time::sleep(*delay).await;
        }
        self.table
            .iter()
            .find(|(source, _, _)| *source == text)
            .map_or_else(
                || TranslationResult::degraded(text),
                |(_, translated, confidence)| TranslationResult::new(*translated, *confidence),
            )
    }
}

/// Translator double whose remote service is always down
#[derive(Default)]
pub struct FailingTranslator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, text: &str, _from: &str, _to: &str) -> TranslationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TranslationResult::degraded(text)
    }
}

/// How a scripted playback behaves when asked to speak
#[derive(Clone, Copy)]
pub enum PlaybackScript {
    /// Finish immediately
    Succeed,
    /// Block until cancelled, then report `Cancelled`
    UntilCancelled,
    /// Fail with a synthesis error
    Fail,
}

/// Speech playback double recording what it was asked to say
pub struct ScriptedPlayback {
    script: PlaybackScript,
    available: bool,
    pub spoken: Mutex<Vec<(String, String, VoiceParams)>>,
}

impl ScriptedPlayback {
    pub fn new(script: PlaybackScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            available: true,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            script: PlaybackScript::Succeed,
            available: false,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn spoken(&self) -> Vec<(String, String, VoiceParams)> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechPlayback for ScriptedPlayback {
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
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), language.to_string(), *voice));
        match self.script {
            PlaybackScript::Succeed => Ok(()),
            PlaybackScript::UntilCancelled => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            PlaybackScript::Fail => Err(Error::Synthesis("audio device lost".to_string())),
        }
    }
}

/// Observer recording every callback in order
#[derive(Default)]
pub struct RecordingObserver {
    pub statuses: Mutex<Vec<SessionState>>,
    pub results: Mutex<Vec<TranslationSessionResult>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn statuses(&self) -> Vec<SessionState> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<TranslationSessionResult> {
        self.results.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_status(&self, state: SessionState) {
        self.statuses.lock().unwrap().push(state);
    }

    fn on_result(&self, result: &TranslationSessionResult) {
        self.results.lock().unwrap().push(result.clone());
    }

    fn on_error(&self, reason: &str) {
        self.errors.lock().unwrap().push(reason.to_string());
    }
}

/// Build an orchestrator over the given doubles with an `en-US` → `es-ES` pair
pub fn orchestrator(
    capture: Arc<dyn SpeechCapture>,
    translator: Arc<dyn Translator>,
    playback: Arc<dyn SpeechPlayback>,
) -> (Arc<TranslationOrchestrator>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let orchestrator = TranslationOrchestrator::new(
        capture,
        translator,
        playback,
        LanguagePair::new("en-US", "es-ES"),
    )
    .with_observer(observer.clone());
    (Arc::new(orchestrator), observer)
}

/// Poll until `condition` holds or a second passes
pub async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
