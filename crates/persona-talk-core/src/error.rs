//! Error types for the core crate.

use persona_talk_config::ConfigError;
use persona_talk_protocol::{AuthError, GatewayError};
use persona_talk_store::StoreError;
use thiserror::Error;

/// Errors returned synchronously from a chat turn.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The outgoing message was empty or whitespace only; nothing was sent.
    #[error("message is empty")]
    EmptyInput,
    /// The completion gateway failed; the user message stays in history.
    #[error("{}", .0.user_message())]
    Gateway(#[from] GatewayError),
    /// A Gem without instruction text cannot become a persona.
    #[error("persona has no instruction text")]
    MissingInstruction,
    /// `retry` was called without an unanswered user message.
    #[error("nothing to retry")]
    NothingToRetry,
}

/// Errors returned while persisting an embedded record.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Nobody is signed in.
    #[error("not signed in")]
    Unauthenticated,
    /// The auth collaborator failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The log store rejected the record.
    #[error("{0}")]
    Persistence(String),
    /// The background dispatch task did not complete.
    #[error("dispatch task failed: {0}")]
    Task(String),
}

/// Errors raised while wiring collaborators together.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(String),
    /// The persona selector matched nothing.
    #[error("unknown persona: {0}")]
    UnknownPersona(String),
    /// Session construction error.
    #[error(transparent)]
    Session(#[from] SessionError),
}
