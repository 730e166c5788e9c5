//! Local persona ("Gem") store backed by a single JSON file.

use crate::error::StoreError;
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use persona_talk_protocol::{Gem, GemDraft, GemId, GemPatch};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[async_trait]
/// Persona store used by the Gem chat variant.
pub trait GemStore: Send + Sync {
    /// All gems, newest first.
    async fn list(&self) -> Result<Vec<Gem>, StoreError>;

    /// Look up one gem.
    async fn get(&self, id: GemId) -> Result<Option<Gem>, StoreError>;

    /// Create a gem from a draft; it becomes the first entry of `list`.
    async fn create(&self, draft: GemDraft) -> Result<Gem, StoreError>;

    /// Apply a partial update and return the updated gem.
    async fn update(&self, id: GemId, patch: GemPatch) -> Result<Gem, StoreError>;

    /// Remove a gem; returns whether anything was removed.
    async fn delete(&self, id: GemId) -> Result<bool, StoreError>;
}

/// Gem store persisted as a JSON array, rewritten atomically on each change.
#[derive(Debug)]
pub struct JsonGemStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonGemStore {
    /// Create a store rooted at `path`; the file is created on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        info!("initialized gem store (path={})", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load every gem. A missing, unreadable or corrupt file reads as empty.
    fn load(&self) -> Vec<Gem> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(
                    "failed to read gem store (path={}): {err}",
                    self.path.display()
                );
                return Vec::new();
            }
        };
        if contents.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<Gem>>(&contents) {
            Ok(gems) => gems,
            Err(err) => {
                warn!(
                    "invalid gem store ignored (path={}): {err}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    /// Rewrite the store atomically.
    fn write(&self, gems: &[Gem]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let encoded = serde_json::to_string_pretty(gems)?;
            file.write_all(encoded.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(temp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl GemStore for JsonGemStore {
    async fn list(&self) -> Result<Vec<Gem>, StoreError> {
        Ok(self.load())
    }

    async fn get(&self, id: GemId) -> Result<Option<Gem>, StoreError> {
        Ok(self.load().into_iter().find(|gem| gem.id == id))
    }

    async fn create(&self, draft: GemDraft) -> Result<Gem, StoreError> {
        let _guard = self.write_lock.lock();
        let mut gems = self.load();
        let gem = Gem::from_draft(draft);
        gems.insert(0, gem.clone());
        self.write(&gems)?;
        debug!("created gem (id={}, total={})", gem.id, gems.len());
        Ok(gem)
    }

    async fn update(&self, id: GemId, patch: GemPatch) -> Result<Gem, StoreError> {
        let _guard = self.write_lock.lock();
        let mut gems = self.load();
        let Some(gem) = gems.iter_mut().find(|gem| gem.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        gem.apply(patch);
        let updated = gem.clone();
        self.write(&gems)?;
        debug!("updated gem (id={id})");
        Ok(updated)
    }

    async fn delete(&self, id: GemId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let mut gems = self.load();
        let before = gems.len();
        gems.retain(|gem| gem.id != id);
        if gems.len() == before {
            return Ok(false);
        }
        self.write(&gems)?;
        debug!("deleted gem (id={id}, remaining={})", gems.len());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{GemStore, JsonGemStore};
    use persona_talk_protocol::{GemDraft, GemPatch};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn draft(name: &str) -> GemDraft {
        GemDraft {
            name: name.to_string(),
            icon: "✨".to_string(),
            description: String::new(),
            instruction_text: format!("You are {name}."),
        }
    }

    #[tokio::test]
    async fn create_prepends_and_persists() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("gems.json");
        let store = JsonGemStore::new(&path);
        let first = store.create(draft("first")).await.expect("create");
        let second = store.create(draft("second")).await.expect("create");

        let reopened = JsonGemStore::new(&path);
        let ids = reopened
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|gem| gem.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(!temp.path().join("gems.json.tmp").exists());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let temp = tempdir().expect("tempdir");
        let store = JsonGemStore::new(temp.path().join("gems.json"));
        let gem = store.create(draft("chef")).await.expect("create");

        let updated = store
            .update(
                gem.id,
                GemPatch {
                    icon: Some("🍳".to_string()),
                    ..GemPatch::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.icon, "🍳");
        assert_eq!(updated.name, "chef");
        assert_eq!(
            store.get(gem.id).await.expect("get").map(|gem| gem.icon),
            Some("🍳".to_string())
        );

        assert!(store.delete(gem.id).await.expect("delete"));
        assert!(!store.delete(gem.id).await.expect("delete again"));
        assert_eq!(store.get(gem.id).await.expect("get"), None);
    }

    #[tokio::test]
    async fn update_missing_gem_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let store = JsonGemStore::new(temp.path().join("gems.json"));
        let err = store
            .update(Uuid::new_v4(), GemPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("gems.json");
        std::fs::write(&path, "{not json").expect("write");
        let store = JsonGemStore::new(&path);
        assert!(store.list().await.expect("list").is_empty());

        let gem = store.create(draft("fresh")).await.expect("create");
        assert_eq!(store.list().await.expect("list"), vec![gem]);
    }
}
