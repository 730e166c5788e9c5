//! Conversation session: history ownership and single-flight turns.

use crate::dispatch::{DispatchHandle, SideEffectDispatcher};
use crate::error::SessionError;
use crate::payload::{self, PayloadOutcome};
use crate::persona::Persona;
use crate::speech::SilentSpeechRenderer;
use log::{debug, info, warn};
use parking_lot::RwLock;
use persona_talk_protocol::{
    CompletionGateway, CompletionRequest, EmbeddedRecord, EventMsg, EventPayload, EventSink,
    Message, Role, SessionId, SpeechRenderer, TurnId,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Result of a `submit` or `retry` call that did not fail.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Another turn was in flight; nothing happened.
    Ignored,
    /// The gateway replied and the visible text was appended.
    Completed(TurnReply),
}

/// A completed turn.
#[derive(Debug)]
pub struct TurnReply {
    pub turn_id: TurnId,
    /// Reply with any embedded tag removed; may be empty.
    pub visible_text: String,
    /// Record decoded from the reply, whether or not it is persisted.
    pub record: Option<EmbeddedRecord>,
    /// Background persistence of `record`, when the persona dispatches.
    pub dispatch: Option<DispatchHandle>,
}

/// Releases the in-flight flag when dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Builder for [`ConversationSession`].
pub struct SessionBuilder {
    persona: Persona,
    gateway: Arc<dyn CompletionGateway>,
    speech: Arc<dyn SpeechRenderer>,
    speech_enabled: bool,
    dispatcher: Option<Arc<SideEffectDispatcher>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl SessionBuilder {
    pub fn new(persona: Persona, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            persona,
            gateway,
            speech: Arc::new(SilentSpeechRenderer),
            speech_enabled: true,
            dispatcher: None,
            event_sink: None,
        }
    }

    pub fn speech(mut self, speech: Arc<dyn SpeechRenderer>) -> Self {
        self.speech = speech;
        self
    }

    pub fn speech_enabled(mut self, enabled: bool) -> Self {
        self.speech_enabled = enabled;
        self
    }

    /// Persist records decoded from replies; only used by personas that dispatch.
    pub fn dispatcher(mut self, dispatcher: Arc<SideEffectDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Create the session, seeding (and speaking) the persona greeting.
    pub fn build(self) -> ConversationSession {
        let session = ConversationSession {
            id: Uuid::new_v4(),
            persona: self.persona,
            gateway: self.gateway,
            history: RwLock::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            speech: self.speech,
            speech_enabled: AtomicBool::new(self.speech_enabled),
            dispatcher: self.dispatcher,
            event_sink: self.event_sink,
        };
        info!(
            "created session (session_id={}, persona={})",
            session.id,
            session.persona.name()
        );
        if let Some(greeting) = session.persona.greeting().map(str::to_string) {
            session.history.write().push(Message::assistant(greeting.clone()));
            session.speak(&greeting);
        }
        session
    }
}

/// One chat instance: owns its history and runs at most one turn at a time.
pub struct ConversationSession {
    id: SessionId,
    persona: Persona,
    gateway: Arc<dyn CompletionGateway>,
    history: RwLock<Vec<Message>>,
    in_flight: AtomicBool,
    speech: Arc<dyn SpeechRenderer>,
    speech_enabled: AtomicBool,
    dispatcher: Option<Arc<SideEffectDispatcher>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl ConversationSession {
    /// Start building a session for `persona`.
    pub fn builder(persona: Persona, gateway: Arc<dyn CompletionGateway>) -> SessionBuilder {
        SessionBuilder::new(persona, gateway)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Snapshot of the transcript, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.history.read().clone()
    }

    /// Whether a turn is waiting on the gateway.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn speech_enabled(&self) -> bool {
        self.speech_enabled.load(Ordering::Acquire)
    }

    /// Toggle speech; disabling it stops any utterance in progress.
    pub fn set_speech_enabled(&self, enabled: bool) {
        self.speech_enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.speech.cancel_all();
        }
    }

    /// Stop the utterance in progress, if any.
    pub fn stop_speaking(&self) {
        self.speech.cancel_all();
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    /// Send a user message and wait for the reply.
    ///
    /// Empty input is rejected without touching history. A call made while a
    /// turn is in flight returns [`TurnOutcome::Ignored`]. On gateway failure
    /// the user message stays in history so [`retry`](Self::retry) can resend it.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(
                "turn already in flight, ignoring submit (session_id={})",
                self.id
            );
            return Ok(TurnOutcome::Ignored);
        };
        self.history.write().push(Message::user(text));
        self.run_turn().await.map(TurnOutcome::Completed)
    }

    /// Resend history ending with an unanswered user message.
    pub async fn retry(&self) -> Result<TurnOutcome, SessionError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Ok(TurnOutcome::Ignored);
        };
        let pending = self
            .history
            .read()
            .last()
            .is_some_and(|message| message.role == Role::User);
        if !pending {
            return Err(SessionError::NothingToRetry);
        }
        self.run_turn().await.map(TurnOutcome::Completed)
    }

    /// Call the gateway with the current history; the caller holds the guard.
    async fn run_turn(&self) -> Result<TurnReply, SessionError> {
        let turn_id = Uuid::new_v4();
        let request = CompletionRequest {
            instruction: self.persona.instruction().to_string(),
            messages: self.history(),
        };
        info!(
            "starting turn (session_id={}, turn_id={}, messages={})",
            self.id,
            turn_id,
            request.messages.len()
        );
        self.emit(EventPayload::TurnStarted { turn_id });

        let raw = match self.gateway.complete(&request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "turn failed (session_id={}, turn_id={}): {err}",
                    self.id, turn_id
                );
                self.emit(EventPayload::TurnFailed {
                    turn_id,
                    message: err.user_message(),
                });
                return Err(SessionError::Gateway(err));
            }
        };

        let decoded = payload::decode(&raw);
        let visible_text = decoded.visible_text;
        let record = match decoded.outcome {
            PayloadOutcome::Absent => None,
            PayloadOutcome::Record(record) => Some(record),
            PayloadOutcome::Rejected(reason) => {
                warn!(
                    "embedded payload rejected (session_id={}, turn_id={}): {reason}",
                    self.id, turn_id
                );
                self.emit(EventPayload::PayloadRejected {
                    turn_id,
                    reason: reason.to_string(),
                });
                None
            }
        };

        let transcript = {
            let mut history = self.history.write();
            history.push(Message::assistant(visible_text.clone()));
            history.clone()
        };
        debug!(
            "turn completed (session_id={}, turn_id={}, reply_len={}, visible_len={}, record={})",
            self.id,
            turn_id,
            raw.len(),
            visible_text.len(),
            record.is_some()
        );
        self.emit(EventPayload::TurnCompleted {
            turn_id,
            visible_text: visible_text.clone(),
            record_detected: record.is_some(),
        });
        self.speak(&visible_text);

        let dispatch = match (&record, &self.dispatcher) {
            (Some(record), Some(dispatcher)) if self.persona.dispatches_records() => {
                Some(dispatcher.spawn(record.clone(), transcript))
            }
            _ => None,
        };

        Ok(TurnReply {
            turn_id,
            visible_text,
            record,
            dispatch,
        })
    }

    fn speak(&self, text: &str) {
        if self.speech_enabled() && !text.trim().is_empty() {
            self.speech.speak(text);
        }
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(Some(self.id), payload));
        }
    }
}
