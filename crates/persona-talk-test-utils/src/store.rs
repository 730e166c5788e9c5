use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use persona_talk_protocol::{
    EmbeddedRecord, Gem, GemDraft, GemId, GemPatch, LearningLog, Message, Principal,
};
use persona_talk_store::{GemStore, LearningLogStore, StoreError};
use uuid::Uuid;

/// In-memory learning log store; `failing` makes every insert fail.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: Mutex<Vec<LearningLog>>,
    failure: Option<String>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            logs: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn logs(&self) -> Vec<LearningLog> {
        self.logs.lock().clone()
    }
}

#[async_trait]
impl LearningLogStore for MemoryLogStore {
    async fn insert(
        &self,
        principal: &Principal,
        record: &EmbeddedRecord,
        transcript: &[Message],
    ) -> Result<LearningLog, StoreError> {
        if let Some(message) = &self.failure {
            return Err(StoreError::Io(std::io::Error::other(message.clone())));
        }
        let log = LearningLog {
            id: Uuid::new_v4(),
            user_id: principal.user_id.clone(),
            subject: record.subject.clone(),
            topic: record.topic.clone(),
            evaluation: record.evaluation,
            summary: record.summary.clone(),
            transcript: transcript.to_vec(),
            created_at: Utc::now(),
        };
        self.logs.lock().push(log.clone());
        Ok(log)
    }

    async fn list_all(&self, _principal: &Principal) -> Result<Vec<LearningLog>, StoreError> {
        Ok(self.logs.lock().iter().rev().cloned().collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<LearningLog>, StoreError> {
        Ok(self
            .logs
            .lock()
            .iter()
            .rev()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// In-memory gem store, newest first.
#[derive(Debug, Default)]
pub struct MemoryGemStore {
    gems: Mutex<Vec<Gem>>,
}

impl MemoryGemStore {
    pub fn with_gems(gems: Vec<Gem>) -> Self {
        Self {
            gems: Mutex::new(gems),
        }
    }
}

#[async_trait]
impl GemStore for MemoryGemStore {
    async fn list(&self) -> Result<Vec<Gem>, StoreError> {
        Ok(self.gems.lock().clone())
    }

    async fn get(&self, id: GemId) -> Result<Option<Gem>, StoreError> {
        Ok(self.gems.lock().iter().find(|gem| gem.id == id).cloned())
    }

    async fn create(&self, draft: GemDraft) -> Result<Gem, StoreError> {
        let gem = Gem::from_draft(draft);
        self.gems.lock().insert(0, gem.clone());
        Ok(gem)
    }

    async fn update(&self, id: GemId, patch: GemPatch) -> Result<Gem, StoreError> {
        let mut gems = self.gems.lock();
        let gem = gems
            .iter_mut()
            .find(|gem| gem.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        gem.apply(patch);
        Ok(gem.clone())
    }

    async fn delete(&self, id: GemId) -> Result<bool, StoreError> {
        let mut gems = self.gems.lock();
        let before = gems.len();
        gems.retain(|gem| gem.id != id);
        Ok(gems.len() != before)
    }
}
