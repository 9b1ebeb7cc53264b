//! Anthropic Claude provider implementation

use super::sse::decode_stream;
use super::types::{LlmContent, LlmMessage, LlmRequest};
use super::{LlmConfig, LlmError, LlmService, LlmStream};
use crate::protocol::{ContentBlock, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Headroom above the thinking budget left for the visible answer
const ANSWER_HEADROOM_TOKENS: u32 = 4096;

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    thinking_budget: u32,
}

impl AnthropicService {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = match config.gateway.as_deref() {
            Some(gw) => format!("{}/_/gateway/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            thinking_budget: config.thinking_budget,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let system = request
            .system
            .iter()
            .map(|s| AnthropicSystemBlock {
                r#type: "text",
                text: s.text.clone(),
                cache_control: s.cache.then_some(CacheControl { r#type: "ephemeral" }),
            })
            .collect();

        let mut messages: Vec<AnthropicMessage> = Vec::with_capacity(request.messages.len());
        for message in request.messages.iter().filter_map(translate_message) {
            // Dropping blocks can leave two neighbours with the same role
            match messages.last_mut() {
                Some(last) if last.role == message.role => last.content.extend(message.content),
                _ => messages.push(message),
            }
        }

        let tools: Vec<AnthropicTool> = request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect();

        let mut max_tokens = request.max_tokens.unwrap_or(self.max_tokens);
        let thinking = (self.thinking_budget > 0).then(|| {
            max_tokens = max_tokens.max(self.thinking_budget.saturating_add(ANSWER_HEADROOM_TOKENS));
            ThinkingConfig {
                r#type: "enabled",
                budget_tokens: self.thinking_budget,
            }
        });

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens,
            system,
            messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
            // Extended thinking requires the default temperature
            temperature: thinking.as_ref().map(|_| 1.0),
            thinking,
            stream: true,
        }
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let message = body.to_string();
        match status.as_u16() {
            401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
            429 => LlmError::rate_limit(format!("Rate limited: {message}")),
            400 => LlmError::invalid_request(format!("Invalid request: {message}")),
            500..=599 => LlmError::server_error(format!("Server error: {message}")),
            _ => LlmError::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

/// Translate one message, or `None` if nothing sendable remains
fn translate_message(msg: &LlmMessage) -> Option<AnthropicMessage> {
    let content: Vec<AnthropicContentBlock> = msg
        .content
        .iter()
        .filter_map(|item| match item {
            LlmContent::Block(block) => translate_block(block),
            LlmContent::RedactedThinking { data } => {
                Some(AnthropicContentBlock::RedactedThinking { data: data.clone() })
            }
        })
        .collect();

    if content.is_empty() {
        return None;
    }

    Some(AnthropicMessage {
        role: msg.role,
        content,
    })
}

fn translate_block(block: &ContentBlock) -> Option<AnthropicContentBlock> {
    match block {
        ContentBlock::Text { value } if !value.trim().is_empty() => {
            Some(AnthropicContentBlock::Text {
                text: value.clone(),
            })
        }
        ContentBlock::Text { .. } => None,
        // The API rejects thinking it did not sign
        ContentBlock::Thinking {
            value,
            signature: Some(signature),
        } => Some(AnthropicContentBlock::Thinking {
            thinking: value.clone(),
            signature: signature.clone(),
        }),
        ContentBlock::Thinking { signature: None, .. } => None,
        ContentBlock::ToolUse { id, name, input } => Some(AnthropicContentBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => Some(AnthropicContentBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.clone(),
            is_error: *is_error,
        }),
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(&anthropic_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
            return Err(Self::classify_error(status, &body));
        }

        Ok(decode_stream(response.bytes_stream()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: Vec<AnthropicSystemBlock>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    r#type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct ThinkingConfig {
    r#type: &'static str,
    budget_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: Role,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        signature: String,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, SystemContent, ToolDefinition};
    use serde_json::json;

    fn service(thinking_budget: u32) -> AnthropicService {
        let config = LlmConfig {
            thinking_budget,
            ..LlmConfig::default()
        };
        AnthropicService::new("test-key".to_string(), &config).unwrap()
    }

    fn request(messages: Vec<LlmMessage>) -> LlmRequest {
        LlmRequest {
            system: vec![SystemContent::cached("You are a worldbuilder")],
            messages,
            tools: vec![ToolDefinition {
                name: "instantiate_world".to_string(),
                description: "Create a world".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            max_tokens: None,
        }
    }

    #[test]
    fn test_request_shape_with_thinking() {
        let body = serde_json::to_value(
            service(10_000).translate_request(&request(vec![LlmMessage::user(vec![
                ContentBlock::text("make a world"),
            ])])),
        )
        .unwrap();

        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 10000}));
        assert_eq!(body["temperature"], json!(1.0));
        assert_eq!(body["max_tokens"], json!(14096));
        assert_eq!(body["system"][0]["cache_control"], json!({"type": "ephemeral"}));
        assert_eq!(
            body["messages"],
            json!([{"role": "user", "content": [{"type": "text", "text": "make a world"}]}])
        );
        assert_eq!(body["tools"][0]["name"], json!("instantiate_world"));
    }

    #[test]
    fn test_thinking_disabled_omits_config() {
        let body = serde_json::to_value(
            service(0).translate_request(&request(vec![LlmMessage::user(vec![
                ContentBlock::text("hi"),
            ])])),
        )
        .unwrap();

        assert!(body.get("thinking").is_none());
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_tokens"], json!(8192));
    }

    #[test]
    fn test_unsigned_thinking_dropped_and_neighbours_merged() {
        let messages = vec![
            LlmMessage::user(vec![ContentBlock::text("first")]),
            LlmMessage::assistant(vec![ContentBlock::thinking("unsigned"), ContentBlock::text(" ")]),
            LlmMessage::user(vec![ContentBlock::text("second")]),
            LlmMessage::assistant(vec![
                ContentBlock::Thinking {
                    value: "signed".to_string(),
                    signature: Some("sig".to_string()),
                },
                ContentBlock::tool_use("t1", "instantiate_world", json!({})),
            ]),
            LlmMessage::user(vec![ContentBlock::tool_result("t1", "Created world", false)]),
        ];

        let body = serde_json::to_value(service(0).translate_request(&request(messages))).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"].as_array().unwrap().len(), 2);
        assert_eq!(
            messages[1]["content"][0],
            json!({"type": "thinking", "thinking": "signed", "signature": "sig"})
        );
        assert_eq!(
            messages[2]["content"][0],
            json!({"type": "tool_result", "tool_use_id": "t1", "content": "Created world", "is_error": false})
        );
    }

    #[test]
    fn test_redacted_thinking_replayed_verbatim() {
        let assistant = LlmMessage {
            role: Role::Assistant,
            content: vec![
                LlmContent::RedactedThinking {
                    data: "EmwKAhgB".to_string(),
                },
                ContentBlock::tool_use("t1", "create_taxonomy", json!({})).into(),
            ],
        };
        let messages = vec![
            LlmMessage::user(vec![ContentBlock::text("organize")]),
            assistant,
            LlmMessage::user(vec![ContentBlock::tool_result("t1", "ok", false)]),
        ];

        let body = serde_json::to_value(service(2048).translate_request(&request(messages))).unwrap();
        assert_eq!(
            body["messages"][1]["content"],
            json!([
                {"type": "redacted_thinking", "data": "EmwKAhgB"},
                {"type": "tool_use", "id": "t1", "name": "create_taxonomy", "input": {}},
            ])
        );
    }

    #[test]
    fn test_huge_thinking_budget_saturates_max_tokens() {
        let body = serde_json::to_value(
            service(u32::MAX).translate_request(&request(vec![LlmMessage::user(vec![
                ContentBlock::text("hi"),
            ])])),
        )
        .unwrap();
        assert_eq!(body["max_tokens"], json!(u32::MAX));
    }

    #[test]
    fn test_classify_error() {
        let err = AnthropicService::classify_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"type": "rate_limit_error"}}"#,
        );
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert!(err.message.starts_with("Rate limited: "));

        let err = AnthropicService::classify_error(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(err.kind, LlmErrorKind::Auth);

        let err = AnthropicService::classify_error(reqwest::StatusCode::BAD_GATEWAY, "down");
        assert!(err.is_retryable());
    }
}
