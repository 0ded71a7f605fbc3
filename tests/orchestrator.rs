//! Orchestrator integration tests
//!
//! Drives full sessions through scripted capability doubles.

use std::sync::Arc;
use std::time::Duration;

use voxlate::{
    LanguagePair, SessionOutcome, SessionState, TranslationRequest, VoiceParams, translate_batch,
};

mod common;

use common::{
    CaptureScript, FailingTranslator, PlaybackScript, ScriptedCapture, ScriptedPlayback,
    ScriptedTranslator, orchestrator, wait_for,
};

use SessionState::{Error, Idle, Listening, Speaking, Translating};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

#[tokio::test]
async fn test_voice_session_completes() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 0.95)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator, playback.clone());

    let outcome = orch.start_listening().await;

    let SessionOutcome::Completed(result) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(result.original_text, "Hello");
    assert_eq!(result.translated_text, "Hola");
    assert_eq!(result.from_language, "en-US");
    assert_eq!(result.to_language, "es-ES");
    assert!(approx(result.confidence, 0.9));

    assert_eq!(observer.statuses(), vec![Listening, Translating, Speaking, Idle]);
    assert_eq!(observer.results(), vec![result]);
    assert!(observer.errors().is_empty());

    let spoken = playback.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].0, "Hola");
    assert_eq!(spoken[0].1, "es-ES");
    assert_eq!(orch.state(), Idle);
}

#[tokio::test]
async fn test_translation_failure_speaks_original() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = Arc::new(FailingTranslator::default());
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator, playback.clone());

    let outcome = orch.start_listening().await;

    let SessionOutcome::Completed(result) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(result.original_text, "Hello");
    assert_eq!(result.translated_text, "Hello");
    assert!(approx(result.confidence, 0.0));
    assert!(observer.errors().is_empty());
    assert_eq!(observer.statuses(), vec![Listening, Translating, Speaking, Idle]);
    assert_eq!(playback.spoken()[0].0, "Hello");
}

#[tokio::test]
async fn test_capture_failure_reports_error_once() {
    let capture = ScriptedCapture::new(CaptureScript::Fail("microphone permission denied"));
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator.clone(), playback.clone());

    let outcome = orch.start_listening().await;

    assert!(matches!(outcome, SessionOutcome::Failed(ref reason) if reason.contains("permission")));
    assert_eq!(observer.errors().len(), 1);
    assert!(observer.results().is_empty());
    assert_eq!(observer.statuses(), vec![Listening, Error, Idle]);
    assert_eq!(translator.calls(), 0);
    assert!(playback.spoken().is_empty());
    assert_eq!(orch.state(), Idle);
}

#[tokio::test]
async fn test_translate_text_skips_capture() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("unused", 1.0));
    let translator = ScriptedTranslator::new(&[("Bonjour", "Hello", 0.9)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture.clone(), translator, playback.clone());
    orch.set_languages(LanguagePair::new("fr-FR", "en-US"));

    let outcome = orch.translate_text("Bonjour").await;

    let SessionOutcome::Completed(result) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(result.translated_text, "Hello");
    assert_eq!(result.from_language, "fr-FR");
    assert_eq!(result.to_language, "en-US");
    assert!(approx(result.confidence, 0.9));
    assert_eq!(observer.statuses(), vec![Translating, Speaking, Idle]);
    assert_eq!(capture.calls(), 0);
    assert_eq!(playback.spoken()[0].1, "en-US");
}

#[tokio::test]
async fn test_blank_text_is_ignored() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("unused", 1.0));
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator.clone(), playback);

    assert_eq!(orch.translate_text("   ").await, SessionOutcome::Empty);
    assert!(observer.statuses().is_empty());
    assert_eq!(translator.calls(), 0);
}

#[tokio::test]
async fn test_empty_transcript_returns_to_idle() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("  ", 0.4));
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator.clone(), playback.clone());

    assert_eq!(orch.start_listening().await, SessionOutcome::Empty);
    assert_eq!(observer.statuses(), vec![Listening, Idle]);
    assert!(observer.results().is_empty());
    assert!(observer.errors().is_empty());
    assert_eq!(translator.calls(), 0);
    assert!(playback.spoken().is_empty());
}

#[tokio::test]
async fn test_stop_listening_cancels_capture() {
    let capture = ScriptedCapture::new(CaptureScript::UntilCancelled);
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator.clone(), playback);

    let session = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.start_listening().await }
    });
    wait_for(|| orch.is_listening()).await;

    assert!(orch.stop_listening());
    assert_eq!(session.await.unwrap(), SessionOutcome::Cancelled);
    assert_eq!(orch.state(), Idle);
    assert_eq!(observer.statuses(), vec![Listening, Idle]);
    assert!(observer.errors().is_empty());
    assert_eq!(translator.calls(), 0);
}

#[tokio::test]
async fn test_late_transcript_after_stop_is_dropped() {
    let capture = ScriptedCapture::new(CaptureScript::Delayed(
        "Hello",
        0.9,
        Duration::from_millis(100),
    ));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture.clone(), translator.clone(), playback.clone());

    let session = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.start_listening().await }
    });
    wait_for(|| capture.calls() == 1).await;

    assert!(orch.stop_listening());
    assert_eq!(session.await.unwrap(), SessionOutcome::Cancelled);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(translator.calls(), 0);
    assert!(playback.spoken().is_empty());
    assert!(observer.results().is_empty());
    assert_eq!(observer.statuses(), vec![Listening, Idle]);
}

#[tokio::test]
async fn test_stop_speaking_suppresses_result() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::UntilCancelled);
    let (orch, observer) = orchestrator(capture, translator, playback);

    let session = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.start_listening().await }
    });
    wait_for(|| orch.is_speaking()).await;

    assert!(!orch.stop_listening());
    assert!(orch.stop_speaking());
    assert_eq!(session.await.unwrap(), SessionOutcome::Cancelled);
    assert_eq!(orch.state(), Idle);
    assert_eq!(observer.statuses(), vec![Listening, Translating, Speaking, Idle]);
    assert!(observer.results().is_empty());
    assert!(observer.errors().is_empty());
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let capture = ScriptedCapture::new(CaptureScript::UntilCancelled);
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture.clone(), translator.clone(), playback);

    let session = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.start_listening().await }
    });
    wait_for(|| orch.is_listening()).await;

    assert_eq!(orch.start_listening().await, SessionOutcome::Rejected);
    assert_eq!(orch.translate_text("Hello").await, SessionOutcome::Rejected);
    assert_eq!(capture.calls(), 1);
    assert_eq!(translator.calls(), 0);
    assert_eq!(observer.statuses(), vec![Listening]);

    orch.stop_listening();
    assert_eq!(session.await.unwrap(), SessionOutcome::Cancelled);
}

#[tokio::test]
async fn test_dropped_listen_returns_to_idle() {
    let capture = ScriptedCapture::new(CaptureScript::UntilCancelled);
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator, playback);

    let timed_out = tokio::time::timeout(Duration::from_millis(50), orch.start_listening()).await;

    assert!(timed_out.is_err());
    assert_eq!(orch.state(), Idle);
    assert_eq!(observer.statuses(), vec![Listening, Idle]);
    assert!(matches!(orch.translate_text("Hello").await, SessionOutcome::Completed(_)));
}

#[tokio::test]
async fn test_dropped_translation_returns_to_idle() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("unused", 1.0));
    let translator = ScriptedTranslator::with_delays(
        &[("Hello", "Hola", 1.0)],
        &[("Hello", Duration::from_millis(200))],
    );
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator, playback.clone());

    let session = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.translate_text("Hello").await }
    });
    wait_for(|| orch.is_translating()).await;
    session.abort();
    assert!(session.await.unwrap_err().is_cancelled());

    assert_eq!(orch.state(), Idle);
    assert_eq!(observer.statuses(), vec![Translating, Idle]);
    assert!(observer.results().is_empty());
    assert!(playback.spoken().is_empty());
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture, translator, playback);

    assert!(!orch.stop_listening());
    assert!(!orch.stop_speaking());
    assert!(observer.statuses().is_empty());
    assert_eq!(orch.state(), Idle);
}

#[tokio::test]
async fn test_unsupported_capture_fails_without_state_change() {
    let capture = ScriptedCapture::unavailable();
    let translator = ScriptedTranslator::new(&[]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture.clone(), translator, playback);

    assert!(!orch.capabilities().speech_capture);
    assert!(orch.capabilities().speech_playback);

    let outcome = orch.start_listening().await;

    assert!(matches!(outcome, SessionOutcome::Failed(_)));
    assert_eq!(observer.errors().len(), 1);
    assert!(observer.statuses().is_empty());
    assert_eq!(capture.calls(), 0);
    assert_eq!(orch.state(), Idle);
}

#[tokio::test]
async fn test_unsupported_playback_fails_after_translation() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("unused", 1.0));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::unavailable();
    let (orch, observer) = orchestrator(capture, translator.clone(), playback.clone());

    let outcome = orch.translate_text("Hello").await;

    assert!(matches!(outcome, SessionOutcome::Failed(_)));
    assert_eq!(translator.calls(), 1);
    assert_eq!(observer.statuses(), vec![Translating, Error, Idle]);
    assert_eq!(observer.errors().len(), 1);
    assert!(observer.results().is_empty());
    assert!(playback.spoken().is_empty());
}

#[tokio::test]
async fn test_playback_failure_reports_error() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Fail);
    let (orch, observer) = orchestrator(capture, translator, playback);

    let outcome = orch.start_listening().await;

    assert!(matches!(outcome, SessionOutcome::Failed(ref reason) if reason.contains("audio device lost")));
    assert_eq!(
        observer.statuses(),
        vec![Listening, Translating, Speaking, Error, Idle]
    );
    assert_eq!(observer.errors().len(), 1);
    assert!(observer.results().is_empty());
}

#[tokio::test]
async fn test_confidence_is_minimum_of_stages() {
    for (capture_conf, translate_conf, expected) in [(0.6, 0.95, 0.6), (0.99, 0.7, 0.7)] {
        let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", capture_conf));
        let translator = ScriptedTranslator::new(&[("Hello", "Hola", translate_conf)]);
        let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
        let (orch, _) = orchestrator(capture, translator, playback);

        let SessionOutcome::Completed(result) = orch.start_listening().await else {
            panic!("expected completion");
        };
        assert!(approx(result.confidence, expected), "{}", result.confidence);
    }
}

#[tokio::test]
async fn test_voice_params_reach_playback() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, _) = orchestrator(capture, translator, playback.clone());

    let voice = VoiceParams::new(1.5, 0.8, 0.5);
    orch.set_voice(voice);
    orch.start_listening().await;

    assert_eq!(playback.spoken()[0].2, voice);
}

#[tokio::test]
async fn test_language_change_applies_to_next_run() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::UntilCancelled);
    let (orch, _) = orchestrator(capture, translator, playback.clone());

    let session = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.start_listening().await }
    });
    wait_for(|| orch.is_speaking()).await;

    let swapped = orch.swap_languages();
    assert_eq!(swapped, LanguagePair::new("es-ES", "en-US"));
    assert_eq!(playback.spoken()[0].1, "es-ES");

    orch.stop_speaking();
    session.await.unwrap();
    assert_eq!(orch.languages(), swapped);
}

#[tokio::test]
async fn test_sessions_run_back_to_back() {
    let capture = ScriptedCapture::new(CaptureScript::Utterance("Hello", 0.9));
    let translator = ScriptedTranslator::new(&[("Hello", "Hola", 1.0)]);
    let playback = ScriptedPlayback::new(PlaybackScript::Succeed);
    let (orch, observer) = orchestrator(capture.clone(), translator, playback);

    assert!(matches!(orch.start_listening().await, SessionOutcome::Completed(_)));
    assert!(matches!(orch.translate_text("Hello").await, SessionOutcome::Completed(_)));

    assert_eq!(capture.calls(), 1);
    assert_eq!(observer.results().len(), 2);
    assert_eq!(orch.state(), Idle);
}

#[tokio::test]
async fn test_batch_preserves_request_order() {
    let translator = ScriptedTranslator::with_delays(
        &[("one", "uno", 1.0), ("two", "dos", 1.0), ("three", "tres", 1.0)],
        &[("one", Duration::from_millis(60)), ("two", Duration::from_millis(30))],
    );

    let requests = [
        TranslationRequest::new("one", "en", "es"),
        TranslationRequest::new("two", "en", "es"),
        TranslationRequest::new("three", "en", "es"),
        TranslationRequest::new("four", "en", "es"),
    ];
    let results = translate_batch(translator.as_ref(), &requests).await;

    let texts: Vec<&str> = results.iter().map(|r| r.translated_text.as_str()).collect();
    assert_eq!(texts, vec!["uno", "dos", "tres", "four"]);
    assert!(results[3].is_degraded());
    assert_eq!(translator.calls(), 4);
}
