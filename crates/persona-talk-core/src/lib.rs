//! Core chat primitives for persona-talk.
//!
//! This crate owns the embedded-payload codec, persona definitions, the
//! conversation session, the side-effect dispatcher and the concrete
//! collaborators (HTTP completion gateway, speech renderers, notices).

pub mod auth;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod notice;
pub mod payload;
pub mod persona;
pub mod session;
pub mod speech;

pub use auth::StaticPrincipalProvider;
pub use dispatch::{DispatchHandle, DispatchReceipt, SideEffectDispatcher};
pub use error::{CoreError, DispatchError, SessionError};
pub use gateway::HttpCompletionGateway;
pub use notice::{Notice, NoticeBoard};
/// Embedded-payload codec entry points.
pub use payload::{DecodedReply, PayloadError, PayloadOutcome, decode, extract};
pub use persona::{Persona, PersonaKind, TUTOR_GREETING};
pub use session::{ConversationSession, SessionBuilder, TurnOutcome, TurnReply};
pub use speech::{CommandSpeechRenderer, SilentSpeechRenderer, renderer_from_config};
