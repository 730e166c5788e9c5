//! Persists embedded records on behalf of the signed-in principal.

use crate::error::DispatchError;
use crate::notice::NoticeBoard;
use log::{info, warn};
use persona_talk_protocol::{
    EmbeddedRecord, Evaluation, EventMsg, EventPayload, EventSink, LearningLog, Message,
    NoticeKind, Principal, PrincipalProvider,
};
use persona_talk_store::LearningLogStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Confirmation of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Id assigned by the log store.
    pub log_id: Uuid,
    pub subject: String,
    pub evaluation: Evaluation,
}

impl DispatchReceipt {
    /// Text shown in the success notice.
    pub fn notice_text(&self) -> String {
        format!(
            "Saved learning record ({} / evaluation: {})",
            self.subject, self.evaluation
        )
    }
}

/// Handle to a dispatch running in the background.
#[derive(Debug)]
pub struct DispatchHandle {
    handle: JoinHandle<Result<DispatchReceipt, DispatchError>>,
}

impl DispatchHandle {
    /// Await the dispatch result.
    pub async fn finish(self) -> Result<DispatchReceipt, DispatchError> {
        self.handle
            .await
            .map_err(|err| DispatchError::Task(err.to_string()))?
    }
}

/// Saves records through the log store and reports the outcome as a notice.
pub struct SideEffectDispatcher {
    principals: Arc<dyn PrincipalProvider>,
    store: Arc<dyn LearningLogStore>,
    notices: Option<NoticeBoard>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl SideEffectDispatcher {
    pub fn new(principals: Arc<dyn PrincipalProvider>, store: Arc<dyn LearningLogStore>) -> Self {
        Self {
            principals,
            store,
            notices: None,
            event_sink: None,
        }
    }

    /// Post outcomes to `notices`.
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Emit `RecordSaved` / `RecordSaveFailed` events to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Persist `record` with the transcript snapshot.
    pub async fn dispatch(
        &self,
        record: &EmbeddedRecord,
        transcript: &[Message],
    ) -> Result<DispatchReceipt, DispatchError> {
        let result = self.persist(record, transcript).await;
        match &result {
            Ok(receipt) => {
                info!(
                    "learning record saved (log_id={}, evaluation={}, transcript_len={})",
                    receipt.log_id,
                    receipt.evaluation,
                    transcript.len()
                );
                self.emit(EventPayload::RecordSaved {
                    subject: receipt.subject.clone(),
                    evaluation: receipt.evaluation,
                });
                self.notify(NoticeKind::Success, receipt.notice_text());
            }
            Err(err) => {
                warn!("learning record not saved: {err}");
                self.emit(EventPayload::RecordSaveFailed {
                    message: err.to_string(),
                });
                self.notify(NoticeKind::Failure, format!("Save failed: {err}"));
            }
        }
        result
    }

    /// Run [`dispatch`](Self::dispatch) on a background task.
    pub fn spawn(self: &Arc<Self>, record: EmbeddedRecord, transcript: Vec<Message>) -> DispatchHandle {
        let dispatcher = self.clone();
        let handle =
            tokio::spawn(async move { dispatcher.dispatch(&record, &transcript).await });
        DispatchHandle { handle }
    }

    /// Every stored record, newest first. Requires a signed-in principal.
    pub async fn list_all_logs(&self) -> Result<Vec<LearningLog>, DispatchError> {
        let principal = self.signed_in().await?;
        self.store
            .list_all(&principal)
            .await
            .map_err(|err| DispatchError::Persistence(err.to_string()))
    }

    /// Records owned by the signed-in principal, newest first.
    pub async fn list_own_logs(&self) -> Result<Vec<LearningLog>, DispatchError> {
        let principal = self.signed_in().await?;
        self.store
            .list_for_user(&principal.user_id)
            .await
            .map_err(|err| DispatchError::Persistence(err.to_string()))
    }

    async fn signed_in(&self) -> Result<Principal, DispatchError> {
        self.principals
            .current_principal()
            .await?
            .ok_or(DispatchError::Unauthenticated)
    }

    async fn persist(
        &self,
        record: &EmbeddedRecord,
        transcript: &[Message],
    ) -> Result<DispatchReceipt, DispatchError> {
        let principal = self.signed_in().await?;
        let log = self
            .store
            .insert(&principal, record, transcript)
            .await
            .map_err(|err| DispatchError::Persistence(err.to_string()))?;
        Ok(DispatchReceipt {
            log_id: log.id,
            subject: log.subject,
            evaluation: log.evaluation,
        })
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(None, payload));
        }
    }

    fn notify(&self, kind: NoticeKind, text: String) {
        if let Some(notices) = &self.notices {
            notices.post(kind, text);
        }
    }
}
