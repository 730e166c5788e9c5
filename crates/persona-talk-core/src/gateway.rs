//! OpenAI-compatible chat completion gateway.

use crate::error::CoreError;
use async_trait::async_trait;
use log::{debug, warn};
use persona_talk_config::{GatewayConfig, ModelSettings};
use persona_talk_protocol::{CompletionGateway, CompletionRequest, GatewayError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Completion gateway that posts to a `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct HttpCompletionGateway {
    client: Client,
    endpoint: String,
    api_key: String,
    settings: ModelSettings,
}

impl HttpCompletionGateway {
    /// Build a gateway for one persona's model settings.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        settings: ModelSettings,
    ) -> Result<Self, CoreError> {
        let client = Client::builder()
            .build()
            .map_err(|err| CoreError::Http(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            settings,
        })
    }

    /// Build from gateway config, resolving the API key from the environment.
    pub fn from_config(config: &GatewayConfig, settings: ModelSettings) -> Result<Self, CoreError> {
        let api_key = config.resolve_api_key()?;
        Self::new(config.endpoint.clone(), api_key, settings)
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: &request.instruction,
        });
        messages.extend(request.messages.iter().map(|message| ChatMessage {
            role: message.role.as_str(),
            content: &message.content,
        }));
        ChatCompletionRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionGateway for HttpCompletionGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let body = self.build_body(request);
        debug!(
            "sending completion request (model={}, messages={}, instruction_len={})",
            self.settings.model,
            body.messages.len(),
            request.instruction.len()
        );
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Other(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let err = map_http_error(status, &body_text);
            warn!("completion request failed (status={status}): {err}");
            return Err(err);
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Other(format!("invalid response body: {err}")))?;
        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, GatewayError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GatewayError::Empty)
}

fn map_http_error(status: StatusCode, body: &str) -> GatewayError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
        _ => {
            let message = serde_json::from_str::<ErrorResponse>(body)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            GatewayError::Other(format!("gateway error ({}): {message}", status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ChatCompletionResponse, HttpCompletionGateway, extract_text_response, map_http_error,
    };
    use persona_talk_config::PersonasConfig;
    use persona_talk_protocol::{CompletionRequest, GatewayError, Message};
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn body_prepends_instruction_as_system_entry() {
        let gateway = HttpCompletionGateway::new(
            "http://localhost/v1/chat/completions",
            "key",
            PersonasConfig::default().tutor,
        )
        .expect("gateway");
        let request = CompletionRequest {
            instruction: "be kind".to_string(),
            messages: vec![Message::assistant("hi"), Message::user("help")],
        };
        let body = serde_json::to_value(gateway.build_body(&request)).expect("serialize");
        assert_eq!(body["model"], json!("llama3-8b-8192"));
        assert_eq!(body["max_tokens"], json!(512));
        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "be kind" },
                { "role": "assistant", "content": "hi" },
                { "role": "user", "content": "help" },
            ])
        );
    }

    #[test]
    fn status_codes_map_to_typed_failures() {
        assert_eq!(
            map_http_error(StatusCode::TOO_MANY_REQUESTS, ""),
            GatewayError::RateLimited
        );
        assert_eq!(
            map_http_error(StatusCode::UNAUTHORIZED, "{}"),
            GatewayError::Unauthorized
        );
        assert_eq!(
            map_http_error(
                StatusCode::BAD_REQUEST,
                r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#
            ),
            GatewayError::Other("gateway error (400): model not found".to_string())
        );
        assert_eq!(
            map_http_error(StatusCode::BAD_GATEWAY, "upstream down\n"),
            GatewayError::Other("gateway error (502): upstream down".to_string())
        );
    }

    #[test]
    fn blank_or_missing_content_is_empty() {
        let parse = |value: serde_json::Value| {
            extract_text_response(
                serde_json::from_value::<ChatCompletionResponse>(value).expect("response"),
            )
        };
        assert_eq!(parse(json!({ "choices": [] })), Err(GatewayError::Empty));
        assert_eq!(
            parse(json!({ "choices": [{ "message": { "content": null } }] })),
            Err(GatewayError::Empty)
        );
        assert_eq!(
            parse(json!({ "choices": [{ "message": { "content": "  " } }] })),
            Err(GatewayError::Empty)
        );
        assert_eq!(
            parse(json!({ "choices": [{ "message": { "content": "やるぞ！" } }] })),
            Ok("やるぞ！".to_string())
        );
    }
}
