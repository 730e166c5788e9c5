//! User-authored persona ("Gem") types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a Gem.
pub type GemId = Uuid;

/// A persona defined by the user and stored on the local device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Gem {
    pub id: GemId,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
    pub instruction_text: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a Gem; id and timestamp are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GemDraft {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
    pub instruction_text: String,
}

/// Partial update applied to an existing Gem.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instruction_text: Option<String>,
}

impl Gem {
    /// Materialize a draft with a fresh id and creation time.
    pub fn from_draft(draft: GemDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            icon: draft.icon,
            description: draft.description,
            instruction_text: draft.instruction_text,
            created_at: Utc::now(),
        }
    }

    /// Apply the set fields of a patch, leaving id and timestamp intact.
    pub fn apply(&mut self, patch: GemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(instruction_text) = patch.instruction_text {
            self.instruction_text = instruction_text;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Gem, GemDraft, GemPatch};
    use pretty_assertions::assert_eq;

    fn draft() -> GemDraft {
        GemDraft {
            name: "Chef".to_string(),
            icon: "🍳".to_string(),
            description: "Cooking helper".to_string(),
            instruction_text: "You are a chef.".to_string(),
        }
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut gem = Gem::from_draft(draft());
        let original = gem.clone();
        gem.apply(GemPatch {
            name: Some("Head chef".to_string()),
            ..GemPatch::default()
        });
        assert_eq!(gem.name, "Head chef");
        assert_eq!(gem.icon, original.icon);
        assert_eq!(gem.id, original.id);
        assert_eq!(gem.created_at, original.created_at);
    }

    #[test]
    fn gem_uses_camel_case_keys() {
        let gem = Gem::from_draft(draft());
        let value = serde_json::to_value(&gem).expect("serialize");
        assert!(value.get("instructionText").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
