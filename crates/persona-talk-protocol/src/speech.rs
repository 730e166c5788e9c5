//! Speech rendering contract.

use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// Unique identifier for one utterance.
pub type UtteranceId = Uuid;

/// Handle to a single utterance; cancelling it stops playback.
#[derive(Debug, Clone)]
pub struct UtteranceHandle {
    id: UtteranceId,
    cancel: Arc<Notify>,
}

impl UtteranceHandle {
    /// Create a handle for a new utterance.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: Arc::new(Notify::new()),
        }
    }

    /// Utterance identifier.
    pub fn id(&self) -> UtteranceId {
        self.id
    }

    /// Request cancellation. A request made before the renderer waits is kept.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// Resolve once cancellation was requested.
    pub async fn cancelled(&self) {
        self.cancel.notified().await;
    }
}

impl Default for UtteranceHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort audible playback of visible reply text.
///
/// Implementations keep at most one active utterance: `speak` cancels whatever
/// is playing. Failures are swallowed; playback never surfaces an error.
pub trait SpeechRenderer: Send + Sync {
    /// Start speaking `text`, replacing any active utterance.
    fn speak(&self, text: &str) -> UtteranceHandle;
    /// Cancel the active utterance, if any.
    fn cancel_all(&self);
    /// Whether an utterance is currently playing.
    fn is_speaking(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::UtteranceHandle;

    #[tokio::test]
    async fn cancel_before_wait_is_observed() {
        let handle = UtteranceHandle::new();
        handle.cancel();
        handle.cancelled().await;
    }
}
