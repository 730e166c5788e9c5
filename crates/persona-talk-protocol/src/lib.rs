//! Wire protocol types for persona-talk messages, events, and collaborators.

mod auth;
mod gateway;
mod gem;
mod record;
mod speech;

pub use auth::{AuthError, Principal, PrincipalProvider};
pub use gateway::{CompletionGateway, CompletionRequest, GatewayError};
pub use gem::{Gem, GemDraft, GemId, GemPatch};
pub use record::{
    EmbeddedRecord, Evaluation, LearningLog, ParseEvaluationError, SAVE_DATA_TAG,
};
pub use speech::{SpeechRenderer, UtteranceHandle, UtteranceId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a chat session.
pub type SessionId = Uuid;
/// Unique identifier for a turn.
pub type TurnId = Uuid;
/// Unique identifier for a transient notice.
pub type NoticeId = Uuid;

/// Speaker role for a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role from a string; anything other than `user` is an assistant turn.
    pub fn parse(value: &str) -> Self {
        if value == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Role::parse(value))
    }
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Role that produced the message.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Side effect completed.
    Success,
    /// Side effect failed.
    Failure,
}

/// Wrapper for events emitted by sessions and their collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Session the event belongs to, when it is session scoped.
    pub session_id: Option<SessionId>,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

impl EventMsg {
    /// Stamp a payload with a fresh id and the current time.
    pub fn new(session_id: Option<SessionId>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            created_at: Utc::now(),
            payload,
        }
    }
}

/// All events emitted while running chat turns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// A user message was accepted and the gateway call started.
    TurnStarted { turn_id: TurnId },
    /// The gateway replied and the visible text was appended.
    TurnCompleted {
        turn_id: TurnId,
        visible_text: String,
        record_detected: bool,
    },
    /// The gateway call failed; nothing was appended.
    TurnFailed { turn_id: TurnId, message: String },
    /// An embedded payload parsed but did not match the record shape.
    PayloadRejected { turn_id: TurnId, reason: String },
    /// A learning record was persisted.
    RecordSaved {
        subject: String,
        evaluation: Evaluation,
    },
    /// Persisting a learning record failed.
    RecordSaveFailed { message: String },
    /// A transient notice became visible.
    NoticePosted {
        notice_id: NoticeId,
        kind: NoticeKind,
        text: String,
    },
    /// A transient notice was dismissed or expired.
    NoticeDismissed { notice_id: NoticeId },
    /// Speech playback started.
    SpeechStarted { utterance_id: UtteranceId },
    /// Speech playback ran to completion (or failed silently).
    SpeechFinished { utterance_id: UtteranceId },
    /// Speech playback was cancelled.
    SpeechCancelled { utterance_id: UtteranceId },
}

/// Sink interface for session and collaborator events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn role_parses_and_formats() {
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("assistant"), Role::Assistant);
        assert_eq!(Role::parse("model"), Role::Assistant);
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn message_serializes_with_lowercase_role() {
        let value = serde_json::to_value(Message::user("hello")).expect("serialize");
        assert_eq!(value, json!({ "role": "user", "content": "hello" }));
    }

    #[test]
    fn event_payload_uses_tagged_layout() {
        let event = EventMsg::new(
            None,
            EventPayload::RecordSaved {
                subject: "math".to_string(),
                evaluation: Evaluation::B,
            },
        );
        let encoded = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            encoded["payload"],
            json!({ "type": "record_saved", "payload": { "subject": "math", "evaluation": "B" } })
        );
        let decoded: EventMsg = serde_json::from_value(encoded).expect("deserialize");
        assert_eq!(decoded.payload, event.payload);
    }
}
