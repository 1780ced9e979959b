//! Recognition session integration tests

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use kitchen_voice::config::TimingConfig;
use kitchen_voice::recognition::{self, EventReceiver};
use kitchen_voice::{
    Error, Kitchen, NotificationLevel, RecognitionError, RecognitionEvent, RecognitionSession,
    SessionControl, SessionPhase,
};
use tokio::sync::mpsc;

mod common;

use common::{RecordingSpeechEngine, ScriptedRecognitionEngine};

const ACTIVATED: &str = "Voice assistant activated. I'm ready for your commands!";

struct Harness {
    kitchen: Arc<Kitchen>,
    speech: Arc<RecordingSpeechEngine>,
    engine: Arc<ScriptedRecognitionEngine>,
    session: RecognitionSession,
    events: EventReceiver,
}

fn harness_with(engine: Arc<ScriptedRecognitionEngine>) -> Harness {
    harness_speaking(engine, RecordingSpeechEngine::new())
}

fn harness_speaking(
    engine: Arc<ScriptedRecognitionEngine>,
    speech: Arc<RecordingSpeechEngine>,
) -> Harness {
    let kitchen = common::kitchen(speech.clone());
    let (tx, events) = recognition::event_channel();
    let session = RecognitionSession::new(
        Arc::clone(&kitchen),
        engine.clone(),
        tx,
        TimingConfig::default(),
    );

    Harness {
        kitchen,
        speech,
        engine,
        session,
        events,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedRecognitionEngine::new())
}

fn final_result(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        transcript: text.to_string(),
        is_final: true,
        confidence: 0.92,
    }
}

/// Start the session and confirm the engine came up
async fn start_listening(h: &mut Harness) {
    h.session.start().unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.engine.starts(), 1);
    h.session.handle_event(RecognitionEvent::Started);
}

#[tokio::test]
async fn test_new_session_is_ready() {
    let h = harness();
    let session = h.kitchen.session();

    assert_eq!(h.session.phase(), SessionPhase::Idle);
    assert!(session.is_supported);
    assert_eq!(session.voice_status, "Ready");
}

#[tokio::test(start_paused = true)]
async fn test_start_waits_for_engine_confirmation() {
    let mut h = harness();

    h.session.start().unwrap();
    assert_eq!(h.session.phase(), SessionPhase::Starting);
    assert!(h.kitchen.session().is_listening);
    assert_eq!(h.kitchen.session().voice_status, "Starting...");

    // Engine start is delayed
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.engine.starts(), 0);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.engine.starts(), 1);

    h.session.handle_event(RecognitionEvent::Started);
    assert_eq!(h.session.phase(), SessionPhase::Listening);
    assert_eq!(h.kitchen.session().voice_status, "Listening...");

    common::settle(h.kitchen.speech()).await;
    assert_eq!(h.speech.spoken(), vec![ACTIVATED]);
}

#[tokio::test(start_paused = true)]
async fn test_start_only_from_idle() {
    let mut h = harness();
    start_listening(&mut h).await;

    h.session.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.engine.starts(), 1);
    assert_eq!(h.session.phase(), SessionPhase::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_auto_restart_after_stream_ends() {
    let mut h = harness();
    start_listening(&mut h).await;

    h.session.handle_event(RecognitionEvent::Ended);
    assert_eq!(h.session.phase(), SessionPhase::Starting);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.engine.starts(), 2);

    // Restarts are not announced again
    h.session.handle_event(RecognitionEvent::Started);
    common::settle(h.kitchen.speech()).await;
    assert_eq!(h.speech.spoken(), vec![ACTIVATED]);
    assert_eq!(h.session.phase(), SessionPhase::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_restart() {
    let mut h = harness();
    start_listening(&mut h).await;

    h.session.handle_event(RecognitionEvent::Ended);
    h.session.stop();

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.engine.starts(), 1);
    assert_eq!(h.engine.stops(), 1);
    assert_eq!(h.session.phase(), SessionPhase::Idle);

    let session = h.kitchen.session();
    assert!(!session.is_listening);
    assert!(session.transcript.is_empty());
    assert_eq!(session.voice_status, "Stopped");
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_engine_starts() {
    let mut h = harness();

    h.session.start().unwrap();
    h.session.stop();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.engine.starts(), 0);
    assert_eq!(h.session.phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_forces_idle() {
    let mut h = harness();
    let mut notifications = h.kitchen.subscribe();
    start_listening(&mut h).await;

    h.session
        .handle_event(RecognitionEvent::Error(RecognitionError::NotAllowed));
    h.session.handle_event(RecognitionEvent::Ended);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.session.phase(), SessionPhase::Idle);
    assert_eq!(h.engine.starts(), 1);
    assert!(!h.kitchen.session().is_listening);
    assert_eq!(h.kitchen.session().voice_status, "Error: not-allowed");

    let mut denied = None;
    while let Ok(n) = notifications.try_recv() {
        if n.title == "Microphone Access Denied" {
            denied = Some(n);
        }
    }
    assert_eq!(denied.unwrap().level, NotificationLevel::Destructive);
}

#[tokio::test(start_paused = true)]
async fn test_other_errors_keep_session_alive() {
    let mut h = harness();
    start_listening(&mut h).await;

    h.session
        .handle_event(RecognitionEvent::Error(RecognitionError::NoSpeech));
    assert_eq!(h.kitchen.session().voice_status, "Error: no-speech");

    h.session.handle_event(RecognitionEvent::Ended);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(h.engine.starts(), 2);
    assert!(h.kitchen.session().is_listening);
}

#[tokio::test(start_paused = true)]
async fn test_failed_start_reports_error() {
    let engine = ScriptedRecognitionEngine::new();
    engine.fail_start.store(true, Ordering::SeqCst);
    let mut h = harness_with(engine);

    h.session.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let event = h.events.recv().await.unwrap();
    assert_eq!(event, RecognitionEvent::Ended);
    h.session.handle_event(event);

    assert_eq!(h.session.phase(), SessionPhase::Idle);
    assert_eq!(
        h.kitchen.session().voice_status,
        "Error starting recognition"
    );
}

#[tokio::test]
async fn test_unsupported_engine_never_starts() {
    let mut h = harness_with(ScriptedRecognitionEngine::unsupported());
    let mut notifications = h.kitchen.subscribe();

    assert!(matches!(h.session.start(), Err(Error::Unsupported)));
    assert!(matches!(h.session.start(), Err(Error::Unsupported)));

    assert_eq!(h.session.phase(), SessionPhase::Idle);
    assert_eq!(h.engine.starts(), 0);
    assert!(!h.kitchen.session().is_supported);
    assert_eq!(
        h.kitchen.session().voice_status,
        "Speech recognition not supported"
    );
    assert_eq!(
        notifications.recv().await.unwrap().title,
        "Voice Recognition Unavailable"
    );
}

#[tokio::test(start_paused = true)]
async fn test_final_transcript_runs_command() {
    let mut h = harness();
    start_listening(&mut h).await;

    h.session.handle_event(RecognitionEvent::Result {
        transcript: "go to".to_string(),
        is_final: false,
        confidence: 0.0,
    });
    assert_eq!(h.kitchen.session().transcript, "go to");

    h.session.handle_event(final_result("go to pantry"));
    assert_eq!(h.session.phase(), SessionPhase::Listening);
    h.session.wait_for_commands().await;

    let session = h.kitchen.session();
    assert_eq!(session.transcript, "go to pantry");
    assert!((session.confidence - 0.92).abs() < f32::EPSILON);
    assert_eq!(session.last_command, "go to pantry");
    assert_eq!(session.last_command_success, Some(true));
    assert_eq!(h.kitchen.active_section(), kitchen_voice::Section::Pantry);
}

#[tokio::test(start_paused = true)]
async fn test_stop_command_halts_recognition() {
    let mut h = harness();
    start_listening(&mut h).await;

    h.session.handle_event(final_result("stop"));
    h.session.wait_for_commands().await;

    assert_eq!(h.session.phase(), SessionPhase::Idle);
    assert_eq!(h.engine.stops(), 1);

    // The stream ending afterwards does not restart it
    h.session.handle_event(RecognitionEvent::Ended);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.engine.starts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_silences_reply_in_progress() {
    let mut h = harness_speaking(
        ScriptedRecognitionEngine::new(),
        RecordingSpeechEngine::gated(),
    );
    h.kitchen
        .set_current_recipe(Some(common::recipe_with_steps(5)));
    start_listening(&mut h).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.speech.spoken(), vec![ACTIVATED]);
    h.speech.release(1);

    h.session.handle_event(final_result("read the steps"));
    h.session.handle_event(final_result("go to pantry"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        h.speech.spoken(),
        vec![ACTIVATED, "Reading cooking steps for Test Curry"]
    );
    assert!(h.kitchen.session().is_processing);

    h.session.stop();
    h.speech.release(10);
    h.session.wait_for_commands().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Neither the rest of the reply nor the waiting command is spoken
    assert_eq!(
        h.speech.spoken(),
        vec![ACTIVATED, "Reading cooking steps for Test Curry"]
    );
    assert_eq!(h.kitchen.active_section(), kitchen_voice::Section::Recipes);
    assert!(!h.kitchen.session().is_processing);
    assert!(!h.kitchen.session().is_speaking);
    assert_eq!(h.session.phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_handles_controls() {
    let speech = RecordingSpeechEngine::new();
    let kitchen = common::kitchen(speech);
    let engine = ScriptedRecognitionEngine::new();
    let (tx, events) = recognition::event_channel();
    let session = RecognitionSession::new(
        Arc::clone(&kitchen),
        engine.clone(),
        tx.clone(),
        TimingConfig::default(),
    );

    let (controls, controls_rx) = mpsc::channel(4);
    let task = tokio::spawn(session.run(events, controls_rx));

    controls.send(SessionControl::Start).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.starts(), 1);

    tx.send(RecognitionEvent::Started).unwrap();
    tx.send(final_result("add eggs to shopping list")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(kitchen.session().voice_status, "Command executed");

    drop(controls);
    task.await.unwrap();

    assert!(!kitchen.session().is_listening);
    assert_eq!(engine.stops(), 1);
    let eggs = kitchen
        .shopping_list()
        .into_iter()
        .filter(|i| i.name == "Eggs")
        .count();
    assert_eq!(eggs, 2);
}
