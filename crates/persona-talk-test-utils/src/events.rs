use parking_lot::Mutex;
use persona_talk_protocol::{EventMsg, EventPayload, EventSink};

/// Event sink that keeps every event in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EventMsg>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventMsg> {
        self.events.lock().clone()
    }

    pub fn payloads(&self) -> Vec<EventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: EventMsg) {
        self.events.lock().push(event);
    }
}
