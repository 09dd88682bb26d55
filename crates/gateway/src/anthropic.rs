//! Anthropic Messages API gateway.
//!
//! Wire details:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field
//!
//! The structured AugmentedPrompt is serialized to the wire format here
//! and nowhere else. Every non-success outcome maps into the uniform
//! GatewayError taxonomy; nothing upstream inspects provider bodies.

use async_trait::async_trait;
use heliolab_core::error::GatewayError;
use heliolab_core::gateway::{GatewayReply, GatewayRequest, ModelGateway, Usage};
use heliolab_core::session::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_RATE_LIMIT_RETRY_SECS: u64 = 5;

/// Gateway speaking Anthropic's native Messages API.
pub struct AnthropicGateway {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl AnthropicGateway {
    /// Create a new gateway with the given API key and per-request timeout.
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
            timeout_secs,
        }
    }

    /// Build from application configuration.
    pub fn from_config(config: &heliolab_config::AppConfig) -> Self {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::new(api_key, config.gateway.timeout_secs).with_base_url(&config.gateway.base_url)
    }

    /// Use a custom base URL (testing, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Serialize the prompt's turn window into wire messages, appending
    /// the new user message last.
    fn to_api_messages(request: &GatewayRequest) -> Vec<ApiMessage> {
        let mut messages: Vec<ApiMessage> = request
            .prompt
            .history
            .iter()
            .map(|turn| ApiMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: turn.content.clone(),
            })
            .collect();
        messages.push(ApiMessage {
            role: "user",
            content: request.prompt.user_message.clone(),
        });
        messages
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.prompt.system_text(),
            "messages": Self::to_api_messages(&request),
        });

        debug!(gateway = "anthropic", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        elapsed_secs: self.timeout_secs,
                    }
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_RETRY_SECS);
            return Err(GatewayError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == 408 {
            return Err(GatewayError::Timeout {
                elapsed_secs: self.timeout_secs,
            });
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(GatewayError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: ApiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedReply(format!("Failed to parse response: {e}")))?;

        let text = api_resp
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.clone())
            .ok_or_else(|| GatewayError::MalformedReply("No text block in reply".into()))?;

        Ok(GatewayReply {
            text,
            model: api_resp.model,
            usage: Usage {
                input_tokens: api_resp.usage.input_tokens,
                output_tokens: api_resp.usage.output_tokens,
            },
        })
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
    model: String,
    usage: ApiUsage,
}

#[derive(Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use heliolab_core::prompt::AugmentedPrompt;
    use heliolab_core::session::Turn;

    fn request_with_history() -> GatewayRequest {
        GatewayRequest {
            prompt: AugmentedPrompt {
                instructions: "You are a PV lab assistant.".into(),
                history: vec![
                    Turn::user("Is the chamber ready?"),
                    Turn::assistant("Yes, profile loaded."),
                ],
                snippets: vec![],
                user_message: "Start the cycle.".into(),
            },
            model: "claude-sonnet-4-5-20250929".into(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    #[test]
    fn history_serializes_in_order_with_new_message_last() {
        let messages = AnthropicGateway::to_api_messages(&request_with_history());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content, "Start the cycle.");
    }

    #[test]
    fn response_parsing_extracts_text_block() {
        let raw = serde_json::json!({
            "content": [{"type": "text", "text": "The cycle is running."}],
            "model": "claude-sonnet-4-5-20250929",
            "usage": {"input_tokens": 42, "output_tokens": 9}
        });
        let parsed: ApiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.content[0].text, "The cycle is running.");
        assert_eq!(parsed.usage.input_tokens, 42);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let gateway = AnthropicGateway::new("key", 30).with_base_url("http://localhost:8080/");
        assert_eq!(gateway.base_url, "http://localhost:8080");
    }
}
