//! Completion gateway contract.

use crate::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One completion call: the persona instruction plus the ordered history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Persona instruction, sent ahead of the history as the system entry.
    pub instruction: String,
    /// Conversation so far, oldest first, ending with the new user message.
    pub messages: Vec<Message>,
}

/// Typed failures reported by a completion gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Provider rate limit reached.
    #[error("rate limited by completion provider")]
    RateLimited,
    /// Provider rejected the credentials.
    #[error("completion provider rejected credentials")]
    Unauthorized,
    /// Provider answered without any text.
    #[error("completion provider returned an empty reply")]
    Empty,
    /// Any other failure.
    #[error("completion failed: {0}")]
    Other(String),
}

impl GatewayError {
    /// Message shown to the user so they can decide whether to retry.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::RateLimited => {
                "The API rate limit was reached. Wait a moment and try again.".to_string()
            }
            GatewayError::Unauthorized => {
                "The API key is invalid. Check the configured API key.".to_string()
            }
            GatewayError::Empty => "The AI returned an empty reply. Please try again.".to_string(),
            GatewayError::Other(message) => {
                format!("Failed to get a reply from the AI: {message}")
            }
        }
    }
}

/// Hosted model that turns a request into one generated reply.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Generate a reply for the request.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::GatewayError;

    #[test]
    fn user_messages_are_distinct() {
        let messages = [
            GatewayError::RateLimited.user_message(),
            GatewayError::Unauthorized.user_message(),
            GatewayError::Empty.user_message(),
            GatewayError::Other("boom".to_string()).user_message(),
        ];
        for (idx, message) in messages.iter().enumerate() {
            for other in &messages[idx + 1..] {
                assert_ne!(message, other);
            }
        }
        assert!(messages[3].contains("boom"));
    }
}
