//! Single-slot transient notices with timed auto-dismissal.

use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use persona_talk_protocol::{EventMsg, EventPayload, EventSink, NoticeId, NoticeKind};
use std::sync::{Arc, Weak};
use std::time::Duration;
use uuid::Uuid;

/// A notice currently on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub kind: NoticeKind,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

struct NoticeState {
    current: Mutex<Option<Notice>>,
    duration: Duration,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl NoticeState {
    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(None, payload));
        }
    }

    /// Clear the slot only if it still holds `id`.
    fn expire(&self, id: NoticeId) {
        let expired = {
            let mut current = self.current.lock();
            match current.as_ref() {
                Some(notice) if notice.id == id => current.take(),
                _ => None,
            }
        };
        if let Some(notice) = expired {
            debug!("notice expired (notice_id={})", notice.id);
            self.emit(EventPayload::NoticeDismissed {
                notice_id: notice.id,
            });
        }
    }
}

/// Holds at most one notice; posting replaces the previous one.
#[derive(Clone)]
pub struct NoticeBoard {
    state: Arc<NoticeState>,
}

impl NoticeBoard {
    /// Create a board whose notices dismiss themselves after `duration`.
    pub fn new(duration: Duration, event_sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            state: Arc::new(NoticeState {
                current: Mutex::new(None),
                duration,
                event_sink,
            }),
        }
    }

    /// Show a notice, replacing any visible one, and schedule its dismissal.
    ///
    /// Outside a tokio runtime the notice stays until dismissed.
    pub fn post(&self, kind: NoticeKind, text: impl Into<String>) -> NoticeId {
        let notice = Notice {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            posted_at: Utc::now(),
        };
        let id = notice.id;
        let replaced = self.state.current.lock().replace(notice.clone());
        if let Some(previous) = replaced {
            self.state.emit(EventPayload::NoticeDismissed {
                notice_id: previous.id,
            });
        }
        debug!("notice posted (notice_id={id}, kind={kind:?})");
        self.state.emit(EventPayload::NoticePosted {
            notice_id: id,
            kind,
            text: notice.text,
        });

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let state: Weak<NoticeState> = Arc::downgrade(&self.state);
            let duration = self.state.duration;
            runtime.spawn(async move {
                tokio::time::sleep(duration).await;
                if let Some(state) = state.upgrade() {
                    state.expire(id);
                }
            });
        }
        id
    }

    /// The notice on display, if any.
    pub fn current(&self) -> Option<Notice> {
        self.state.current.lock().clone()
    }

    /// Clear the board immediately.
    pub fn dismiss(&self) -> Option<Notice> {
        let dismissed = self.state.current.lock().take();
        if let Some(notice) = &dismissed {
            self.state.emit(EventPayload::NoticeDismissed {
                notice_id: notice.id,
            });
        }
        dismissed
    }

    /// Configured display duration.
    pub fn duration(&self) -> Duration {
        self.state.duration
    }
}
