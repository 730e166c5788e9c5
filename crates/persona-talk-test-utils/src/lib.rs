//! Test helpers shared across persona-talk crates.

pub mod auth;
pub mod events;
pub mod gateway;
pub mod speech;
pub mod store;

pub use auth::StubPrincipal;
pub use events::CollectingSink;
pub use gateway::{FailingGateway, FixedGateway, GatedGateway, ScriptedGateway};
pub use speech::RecordingSpeech;
pub use store::{MemoryGemStore, MemoryLogStore};
