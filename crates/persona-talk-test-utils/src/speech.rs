use parking_lot::Mutex;
use persona_talk_protocol::{SpeechRenderer, UtteranceHandle};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Speech renderer that records what it was asked to say.
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    active: Mutex<Option<UtteranceHandle>>,
    cancels: AtomicUsize,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechRenderer for RecordingSpeech {
    fn speak(&self, text: &str) -> UtteranceHandle {
        let handle = UtteranceHandle::new();
        self.spoken.lock().push(text.to_string());
        if let Some(previous) = self.active.lock().replace(handle.clone()) {
            previous.cancel();
        }
        handle
    }

    fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.active.lock().take() {
            active.cancel();
        }
    }

    fn is_speaking(&self) -> bool {
        self.active.lock().is_some()
    }
}
