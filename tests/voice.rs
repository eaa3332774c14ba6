//! Voice pipeline integration tests
//!
//! Tests the chunker, emitter and session without a speech endpoint

use std::sync::Arc;
use std::time::Duration;

use crm_voice::llm::ModelResponse;
use crm_voice::prompt::GREETING;
use crm_voice::voice::{PCM_MIME_TYPE, SinkEvent, split_sentences};
use crm_voice::{
    Agent, AgentConfig, ChatModel, Error, SpeechEmitter, Synthesizer, ToolExecutor, VoiceSession,
    shutdown,
};

mod common;

use common::{FailingSynth, PendingModel, RecordingSink, ScriptedModel, ScriptedSynth};

fn session_with(
    model: Arc<dyn ChatModel>,
    synth: Arc<dyn Synthesizer>,
    frame_delay: Duration,
) -> (VoiceSession, crm_voice::SessionHandle, RecordingSink) {
    let agent = Agent::new(
        model,
        ToolExecutor::new(common::setup_test_store()),
        AgentConfig::default(),
    );
    let sink = RecordingSink::default();
    let (session, handle) = VoiceSession::new(
        agent,
        SpeechEmitter::new(synth, frame_delay),
        Box::new(sink.clone()),
        Duration::ZERO,
    );
    (session, handle, sink)
}

#[test]
fn test_chunker_splits_on_terminators() {
    assert_eq!(
        split_sentences("Hello there. How are you"),
        vec!["Hello there.", "How are you."]
    );
    assert_eq!(
        split_sentences("Done! Anything else? v1.2 works."),
        vec!["Done!", "Anything else?", "v1.2 works."]
    );
    assert!(split_sentences("   ").is_empty());
}

#[tokio::test]
async fn test_blank_text_only_ends() {
    let emitter = SpeechEmitter::new(ScriptedSynth::new(vec![vec![0.1]]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let (_trigger, shutdown) = shutdown::channel();

    let report = emitter.emit("  \n ", &mut sink, &shutdown).await.unwrap();

    assert_eq!(sink.trace(), vec!["end"]);
    assert_eq!(report.request_id, None);
    assert_eq!(report.frames, 0);
}

#[tokio::test]
async fn test_emit_protocol_order() {
    let synth = ScriptedSynth::new(vec![vec![0.0, 0.5], vec![], vec![1.0]]);
    let emitter = SpeechEmitter::new(synth, Duration::ZERO);
    let mut sink = RecordingSink::default();
    let (_trigger, shutdown) = shutdown::channel();

    let report = emitter.emit("Hello.", &mut sink, &shutdown).await.unwrap();

    assert_eq!(sink.trace(), vec!["init", "push", "push", "flush", "end"]);
    assert_eq!(report.frames, 2);
    assert_eq!(report.samples, 3);
    assert!(!report.cancelled);

    let events = sink.events();
    let SinkEvent::Initialized(format) = &events[0] else {
        panic!("first event must be initialize");
    };
    assert_eq!(format.sample_rate, 24000);
    assert_eq!(format.channels, 1);
    assert_eq!(format.mime_type, PCM_MIME_TYPE);
    assert_eq!(report.request_id.as_deref(), Some(format.request_id.as_str()));
    assert_eq!(events[1], SinkEvent::Frame(vec![0, 0, 0xFF, 0x3F]));
}

#[tokio::test]
async fn test_mid_stream_failure_still_ends() {
    let synth = ScriptedSynth::failing_after(vec![vec![0.1], vec![0.2], vec![0.3]], 1);
    let emitter = SpeechEmitter::new(synth, Duration::ZERO);
    let mut sink = RecordingSink::default();
    let (_trigger, shutdown) = shutdown::channel();

    let err = emitter.emit("Hello.", &mut sink, &shutdown).await.unwrap_err();

    assert!(matches!(err, Error::Tts(_)));
    assert_eq!(sink.trace(), vec!["init", "push", "end"]);
}

#[tokio::test]
async fn test_synthesis_start_failure_still_ends() {
    let emitter = SpeechEmitter::new(Arc::new(FailingSynth), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let (_trigger, shutdown) = shutdown::channel();

    assert!(emitter.emit("Hello.", &mut sink, &shutdown).await.is_err());
    assert_eq!(sink.trace(), vec!["init", "end"]);
}

#[tokio::test]
async fn test_shutdown_before_emit_skips_frames() {
    let emitter = SpeechEmitter::new(ScriptedSynth::new(vec![vec![0.1]]), Duration::ZERO);
    let mut sink = RecordingSink::default();
    let (trigger, shutdown) = shutdown::channel();
    trigger.trigger();

    let report = emitter.emit("Hello.", &mut sink, &shutdown).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(sink.trace(), vec!["init", "end"]);
}

#[tokio::test]
async fn test_session_speaks_each_segment() {
    let model = ScriptedModel::new([ModelResponse::text("Hello there. How are you")]);
    let synth = ScriptedSynth::new(vec![vec![0.25]]);
    let (mut session, _handle, sink) = session_with(model, synth.clone(), Duration::ZERO);

    let spoken = session.handle_utterance("hi").await.unwrap();

    assert_eq!(spoken.reply.text, "Hello there. How are you");
    assert_eq!(spoken.segments, 2);
    assert_eq!(spoken.failed_segments, 0);
    assert!(!spoken.cancelled);
    assert_eq!(synth.texts(), vec!["Hello there.", "How are you."]);
    assert_eq!(
        sink.trace(),
        vec!["init", "push", "flush", "end", "init", "push", "flush", "end"]
    );
}

#[tokio::test]
async fn test_session_greeting_is_recorded() {
    let model = ScriptedModel::new(std::iter::empty::<ModelResponse>());
    let synth = ScriptedSynth::new(vec![vec![0.25]]);
    let (mut session, _handle, _sink) = session_with(model, synth.clone(), Duration::ZERO);

    let spoken = session.greet().await.unwrap();

    assert_eq!(spoken.reply.text, GREETING);
    assert_eq!(spoken.segments, 3);
    assert_eq!(session.agent().history().len(), 1);
    assert_eq!(
        synth.texts(),
        vec![
            "Hello!",
            "I'm your mini CRM assistant.",
            "How can I help you today?"
        ]
    );
}

#[tokio::test]
async fn test_session_skips_failed_segments() {
    let model = ScriptedModel::new([ModelResponse::text("One. Two.")]);
    let (mut session, _handle, sink) =
        session_with(model, Arc::new(FailingSynth), Duration::ZERO);

    let spoken = session.handle_utterance("count").await.unwrap();

    assert_eq!(spoken.segments, 0);
    assert_eq!(spoken.failed_segments, 2);
    assert_eq!(sink.trace(), vec!["init", "end", "init", "end"]);
}

#[tokio::test]
async fn test_session_end_abandons_inference() {
    let synth = ScriptedSynth::new(vec![vec![0.25]]);
    let (mut session, handle, sink) = session_with(Arc::new(PendingModel), synth, Duration::ZERO);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.end();
    });

    let err = session.handle_utterance("hello?").await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(sink.trace().is_empty());

    let again = session.handle_utterance("still there?").await.unwrap_err();
    assert!(matches!(again, Error::Cancelled));
}

#[tokio::test]
async fn test_session_end_stops_playback_and_closes_sink() {
    let model = ScriptedModel::new([ModelResponse::text("A long answer. With more.")]);
    let synth = ScriptedSynth::new(vec![vec![0.1], vec![0.2], vec![0.3]]);
    let (mut session, handle, sink) = session_with(model, synth, Duration::from_secs(5));

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.end();
    });

    let spoken = session.handle_utterance("talk").await.unwrap();

    assert!(spoken.cancelled);
    assert_eq!(spoken.segments, 0);
    assert_eq!(sink.trace(), vec!["init", "push", "end"]);
}
