#![cfg(unix)]

use persona_talk_core::CommandSpeechRenderer;
use persona_talk_protocol::{EventPayload, SpeechRenderer, UtteranceId};
use persona_talk_test_utils::CollectingSink;
use std::sync::Arc;
use std::time::Duration;

fn shell(script: &str, sink: &Arc<CollectingSink>) -> CommandSpeechRenderer {
    CommandSpeechRenderer::new(
        "sh",
        vec!["-c".to_string(), script.to_string(), "speech".to_string()],
        Some(sink.clone()),
    )
}

async fn wait_for(sink: &CollectingSink, predicate: impl Fn(&EventPayload) -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !sink.payloads().iter().any(&predicate) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "event not observed: {:?}", sink.payloads());
}

fn started(id: UtteranceId) -> impl Fn(&EventPayload) -> bool {
    move |payload| matches!(payload, EventPayload::SpeechStarted { utterance_id } if *utterance_id == id)
}

fn cancelled(id: UtteranceId) -> impl Fn(&EventPayload) -> bool {
    move |payload| matches!(payload, EventPayload::SpeechCancelled { utterance_id } if *utterance_id == id)
}

#[tokio::test]
async fn short_utterance_finishes() {
    let sink = Arc::new(CollectingSink::new());
    let renderer = shell("exit 0", &sink);

    let handle = renderer.speak("こんにちは");
    let id = handle.id();
    wait_for(&sink, move |payload| {
        matches!(payload, EventPayload::SpeechFinished { utterance_id } if *utterance_id == id)
    })
    .await;
    assert!(!renderer.is_speaking());
}

#[tokio::test]
async fn cancel_all_kills_playback() {
    let sink = Arc::new(CollectingSink::new());
    let renderer = shell("sleep 5", &sink);

    let handle = renderer.speak("長い文章");
    wait_for(&sink, started(handle.id())).await;
    assert!(renderer.is_speaking());

    renderer.cancel_all();
    assert!(!renderer.is_speaking());
    wait_for(&sink, cancelled(handle.id())).await;
}

#[tokio::test]
async fn new_utterance_replaces_previous() {
    let sink = Arc::new(CollectingSink::new());
    let renderer = shell("sleep 5", &sink);

    let first = renderer.speak("一つ目");
    wait_for(&sink, started(first.id())).await;
    let second = renderer.speak("二つ目");

    wait_for(&sink, cancelled(first.id())).await;
    wait_for(&sink, started(second.id())).await;
    assert!(renderer.is_speaking());
    renderer.cancel_all();
    wait_for(&sink, cancelled(second.id())).await;
}

#[tokio::test]
async fn missing_program_is_silent() {
    let sink = Arc::new(CollectingSink::new());
    let renderer = CommandSpeechRenderer::new(
        "persona-talk-no-such-tts-program",
        Vec::new(),
        Some(sink.clone()),
    );

    let handle = renderer.speak("hello");
    let id = handle.id();
    wait_for(&sink, move |payload| {
        matches!(payload, EventPayload::SpeechFinished { utterance_id } if *utterance_id == id)
    })
    .await;
    assert!(
        !sink
            .payloads()
            .iter()
            .any(|payload| matches!(payload, EventPayload::SpeechStarted { .. }))
    );
    assert!(!renderer.is_speaking());
}
