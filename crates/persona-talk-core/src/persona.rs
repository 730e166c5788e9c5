//! Persona definitions: instruction text, greeting and model settings.

use crate::error::{CoreError, SessionError};
use persona_talk_config::{ModelSettings, PersonasConfig};
use persona_talk_protocol::{Gem, GemId};
use persona_talk_store::GemStore;

const COACH_INSTRUCTION: &str = include_str!("../prompts/coach.md");
const TUTOR_INSTRUCTION: &str = include_str!("../prompts/tutor.md");

/// First assistant message of every tutoring session.
pub const TUTOR_GREETING: &str = "こんにちは！今日は何の勉強をする？";

/// Persona family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaKind {
    /// Motivational coach with a short reply ceiling.
    Coach,
    /// Socratic tutor that can request a learning record be saved.
    Tutor,
    /// User-authored persona.
    Gem(GemId),
}

/// Everything a session needs to know about who it is talking as.
///
/// The instruction text is never blank: the built-ins are compiled in and
/// [`Persona::from_gem`] refuses Gems without one.
#[derive(Debug, Clone)]
pub struct Persona {
    kind: PersonaKind,
    name: String,
    icon: String,
    instruction: String,
    greeting: Option<String>,
    settings: ModelSettings,
}

impl Persona {
    /// The built-in coach.
    pub fn coach(settings: ModelSettings) -> Self {
        Self {
            kind: PersonaKind::Coach,
            name: "Coach".to_string(),
            icon: "🔥".to_string(),
            instruction: COACH_INSTRUCTION.trim().to_string(),
            greeting: None,
            settings,
        }
    }

    /// The built-in tutor.
    pub fn tutor(settings: ModelSettings) -> Self {
        Self {
            kind: PersonaKind::Tutor,
            name: "Tutor".to_string(),
            icon: "📚".to_string(),
            instruction: TUTOR_INSTRUCTION.trim().to_string(),
            greeting: Some(TUTOR_GREETING.to_string()),
            settings,
        }
    }

    /// A persona backed by a Gem; the Gem must carry instruction text.
    pub fn from_gem(gem: &Gem, settings: ModelSettings) -> Result<Self, SessionError> {
        if gem.instruction_text.trim().is_empty() {
            return Err(SessionError::MissingInstruction);
        }
        Ok(Self {
            kind: PersonaKind::Gem(gem.id),
            name: gem.name.clone(),
            icon: gem.icon.clone(),
            instruction: gem.instruction_text.clone(),
            greeting: None,
            settings,
        })
    }

    /// Resolve `coach`, `tutor` or a Gem id.
    pub async fn resolve(
        selector: &str,
        personas: &PersonasConfig,
        gems: &dyn GemStore,
    ) -> Result<Self, CoreError> {
        match selector {
            "coach" => Ok(Self::coach(personas.coach.clone())),
            "tutor" => Ok(Self::tutor(personas.tutor.clone())),
            other => {
                let id = other
                    .parse::<GemId>()
                    .map_err(|_| CoreError::UnknownPersona(other.to_string()))?;
                let gem = gems
                    .get(id)
                    .await?
                    .ok_or_else(|| CoreError::UnknownPersona(other.to_string()))?;
                Ok(Self::from_gem(&gem, personas.gems.clone())?)
            }
        }
    }

    pub fn kind(&self) -> &PersonaKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// System directive sent ahead of the history.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Assistant message seeded when a session starts.
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Only the tutor's embedded records are persisted.
    pub fn dispatches_records(&self) -> bool {
        self.kind == PersonaKind::Tutor
    }
}

#[cfg(test)]
mod tests {
    use super::{Persona, PersonaKind, TUTOR_GREETING};
    use crate::error::{CoreError, SessionError};
    use persona_talk_config::PersonasConfig;
    use persona_talk_protocol::{Gem, GemDraft, SAVE_DATA_TAG};
    use persona_talk_store::{GemStore, JsonGemStore};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn gem(instruction: &str) -> Gem {
        Gem::from_draft(GemDraft {
            name: "Chef".to_string(),
            icon: "🍳".to_string(),
            description: String::new(),
            instruction_text: instruction.to_string(),
        })
    }

    #[test]
    fn tutor_carries_tag_grammar_and_greeting() {
        let tutor = Persona::tutor(PersonasConfig::default().tutor);
        assert!(tutor.instruction().contains(SAVE_DATA_TAG));
        assert!(tutor.instruction().contains(TUTOR_GREETING));
        assert_eq!(tutor.greeting(), Some(TUTOR_GREETING));
        assert!(tutor.dispatches_records());
    }

    #[test]
    fn coach_has_no_greeting_and_never_dispatches() {
        let coach = Persona::coach(PersonasConfig::default().coach);
        assert_eq!(coach.greeting(), None);
        assert!(!coach.dispatches_records());
        assert!(coach.instruction().contains("100"));
        assert_eq!(coach.settings().max_tokens, 256);
    }

    #[test]
    fn gem_without_instruction_is_rejected() {
        let err = Persona::from_gem(&gem("   "), PersonasConfig::default().gems).unwrap_err();
        assert!(matches!(err, SessionError::MissingInstruction));
    }

    #[test]
    fn built_in_instructions_are_not_blank() {
        let personas = PersonasConfig::default();
        for persona in [
            Persona::coach(personas.coach),
            Persona::tutor(personas.tutor),
        ] {
            assert!(!persona.instruction().trim().is_empty());
        }
    }

    #[tokio::test]
    async fn resolves_selectors() {
        let temp = tempdir().expect("tempdir");
        let store = JsonGemStore::new(temp.path().join("gems.json"));
        let created = store
            .create(GemDraft {
                name: "Chef".to_string(),
                icon: "🍳".to_string(),
                description: String::new(),
                instruction_text: "You are a chef.".to_string(),
            })
            .await
            .expect("create");
        let personas = PersonasConfig::default();

        let tutor = Persona::resolve("tutor", &personas, &store)
            .await
            .expect("tutor");
        assert_eq!(tutor.kind(), &PersonaKind::Tutor);

        let chef = Persona::resolve(&created.id.to_string(), &personas, &store)
            .await
            .expect("gem");
        assert_eq!(chef.kind(), &PersonaKind::Gem(created.id));
        assert_eq!(chef.instruction(), "You are a chef.");
        assert_eq!(chef.name(), "Chef");

        let err = Persona::resolve("pirate", &personas, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownPersona(_)));
    }
}
