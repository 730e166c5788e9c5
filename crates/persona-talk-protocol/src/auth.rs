//! Authenticated principal contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity that owns persisted learning records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    /// Stable user identifier.
    pub user_id: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    /// Build a principal from a user id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

/// Errors returned while resolving the current principal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The auth provider could not be reached or failed.
    #[error("auth provider error: {0}")]
    Provider(String),
}

/// Resolves the principal for the current user, if any.
#[async_trait]
pub trait PrincipalProvider: Send + Sync {
    /// Return the signed-in principal or `None` when nobody is signed in.
    async fn current_principal(&self) -> Result<Option<Principal>, AuthError>;
}
