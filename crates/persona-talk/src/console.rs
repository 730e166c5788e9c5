//! Line-oriented console helpers for the chat client.

use log::debug;
use persona_talk_core::DispatchHandle;
use persona_talk_protocol::{EventMsg, EventPayload, EventSink, LearningLog, NoticeKind};

/// Shown in place of a reply whose visible text is empty.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "(no visible reply)";

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Blank line; ignored.
    Empty,
    /// Text to send to the persona.
    Message(String),
    /// `/retry`: resend the unanswered message.
    Retry,
    /// `/speech on|off`.
    Speech(bool),
    /// `/stop`: interrupt playback.
    Stop,
    /// `/history`: print the transcript.
    History,
    /// `/help`.
    Help,
    /// `/quit` or `/exit`.
    Quit,
    /// Any other slash command.
    Unknown(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ChatInput::Message(line.to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("retry"), None, _) => ChatInput::Retry,
            (Some("speech"), Some("on"), None) => ChatInput::Speech(true),
            (Some("speech"), Some("off"), None) => ChatInput::Speech(false),
            (Some("stop"), None, _) => ChatInput::Stop,
            (Some("history"), None, _) => ChatInput::History,
            (Some("help"), None, _) => ChatInput::Help,
            (Some("quit" | "exit"), None, _) => ChatInput::Quit,
            _ => ChatInput::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
/retry        resend the last unanswered message
/speech on|off toggle read-aloud
/stop         stop the current utterance
/history      print the conversation
/quit         leave";

/// Text to print for an assistant reply.
pub fn reply_text(visible_text: &str) -> &str {
    if visible_text.trim().is_empty() {
        EMPTY_REPLY_PLACEHOLDER
    } else {
        visible_text
    }
}

/// Render a notice as a single console line.
pub fn notice_line(kind: NoticeKind, text: &str) -> String {
    match kind {
        NoticeKind::Success => format!("[ok] {text}"),
        NoticeKind::Failure => format!("[error] {text}"),
    }
}

/// Render a learning log as a single console line.
pub fn log_line(log: &LearningLog) -> String {
    format!(
        "{}  {}  {} / {}  [{}: {}]  {}",
        log.created_at.format("%Y-%m-%d %H:%M"),
        log.user_id,
        log.subject,
        log.topic,
        log.evaluation,
        log.evaluation.label(),
        log.summary
    )
}

/// Wait for outstanding record saves; returns how many completed.
///
/// Outcomes were already reported as notices, so failures are only logged.
pub async fn finish_saves(saves: Vec<DispatchHandle>) -> usize {
    let mut completed = 0;
    for handle in saves {
        match handle.finish().await {
            Ok(_) => completed += 1,
            Err(err) => debug!("save did not complete before exit: {err}"),
        }
    }
    completed
}

/// Event sink that prints notices to stdout and logs the rest.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: EventMsg) {
        match &event.payload {
            EventPayload::NoticePosted { kind, text, .. } => println!("{}", notice_line(*kind, text)),
            other => debug!("event (event_id={}): {other:?}", event.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatInput, EMPTY_REPLY_PLACEHOLDER, finish_saves, notice_line, reply_text};
    use persona_talk_core::SideEffectDispatcher;
    use persona_talk_protocol::{EmbeddedRecord, Evaluation, Message, NoticeKind};
    use persona_talk_test_utils::{MemoryLogStore, StubPrincipal};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn parses_messages_and_commands() {
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
        assert_eq!(
            ChatInput::parse("  二次関数を教えて "),
            ChatInput::Message("二次関数を教えて".to_string())
        );
        assert_eq!(ChatInput::parse("/retry"), ChatInput::Retry);
        assert_eq!(ChatInput::parse("/speech off"), ChatInput::Speech(false));
        assert_eq!(ChatInput::parse("/speech on"), ChatInput::Speech(true));
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Quit);
        assert_eq!(
            ChatInput::parse("/speech loud"),
            ChatInput::Unknown("/speech loud".to_string())
        );
    }

    #[test]
    fn empty_reply_uses_placeholder() {
        assert_eq!(reply_text(""), EMPTY_REPLY_PLACEHOLDER);
        assert_eq!(reply_text(" \n"), EMPTY_REPLY_PLACEHOLDER);
        assert_eq!(reply_text("がんばれ！"), "がんばれ！");
    }

    #[test]
    fn notice_lines_carry_kind() {
        assert_eq!(notice_line(NoticeKind::Success, "saved"), "[ok] saved");
        assert_eq!(notice_line(NoticeKind::Failure, "boom"), "[error] boom");
    }

    #[tokio::test]
    async fn pending_saves_are_awaited() {
        let store = Arc::new(MemoryLogStore::new());
        let saved = Arc::new(SideEffectDispatcher::new(
            Arc::new(StubPrincipal::user("u")),
            store.clone(),
        ));
        let anonymous = Arc::new(SideEffectDispatcher::new(
            Arc::new(StubPrincipal::Anonymous),
            store.clone(),
        ));
        let record = EmbeddedRecord {
            subject: "数学".to_string(),
            topic: "微分".to_string(),
            evaluation: Evaluation::A,
            summary: "完璧".to_string(),
        };
        let transcript = vec![Message::user("微分")];

        let saves = vec![
            saved.spawn(record.clone(), transcript.clone()),
            anonymous.spawn(record.clone(), transcript.clone()),
            saved.spawn(record, transcript),
        ];
        assert_eq!(finish_saves(saves).await, 2);
        assert_eq!(store.logs().len(), 2);
    }
}
