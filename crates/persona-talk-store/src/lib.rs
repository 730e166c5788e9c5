//! Local persistence for learning records and user-authored personas.

pub mod error;
pub mod gems;
pub mod logs;

/// Store error type.
pub use error::StoreError;
/// Persona store interface and JSON file implementation.
pub use gems::{GemStore, JsonGemStore};
/// Learning log store interface and SQLite implementation.
pub use logs::{LearningLogStore, SqliteLearningLogStore};
