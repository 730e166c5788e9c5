use async_trait::async_trait;
use persona_talk_protocol::{AuthError, Principal, PrincipalProvider};

/// Principal provider with a scripted answer.
#[derive(Debug, Clone)]
pub enum StubPrincipal {
    SignedIn(Principal),
    Anonymous,
    Failing(String),
}

impl StubPrincipal {
    pub fn user(user_id: &str) -> Self {
        StubPrincipal::SignedIn(Principal::new(user_id))
    }
}

#[async_trait]
impl PrincipalProvider for StubPrincipal {
    async fn current_principal(&self) -> Result<Option<Principal>, AuthError> {
        match self {
            StubPrincipal::SignedIn(principal) => Ok(Some(principal.clone())),
            StubPrincipal::Anonymous => Ok(None),
            StubPrincipal::Failing(message) => Err(AuthError::Provider(message.clone())),
        }
    }
}
