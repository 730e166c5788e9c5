//! Principal provider backed by a fixed identity.

use async_trait::async_trait;
use persona_talk_protocol::{AuthError, Principal, PrincipalProvider};

/// Returns the same principal (or nobody) for every call.
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipalProvider {
    principal: Option<Principal>,
}

impl StaticPrincipalProvider {
    /// Provider for a signed-in user.
    pub fn signed_in(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// Provider with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalProvider for StaticPrincipalProvider {
    async fn current_principal(&self) -> Result<Option<Principal>, AuthError> {
        Ok(self.principal.clone())
    }
}
