//! Common types for LLM interactions

use super::LlmError;
use crate::protocol::{ContentBlock, Role};
use serde_json::Value;

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Vec<SystemContent>,
    pub messages: Vec<LlmMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
}

/// System prompt content
#[derive(Debug, Clone)]
pub struct SystemContent {
    pub text: String,
    pub cache: bool,
}

impl SystemContent {
    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache: true,
        }
    }
}

/// Block in the provider conversation
#[derive(Debug, Clone, PartialEq)]
pub enum LlmContent {
    Block(ContentBlock),
    /// Encrypted thinking. Only replayed to the provider within the turn
    /// that produced it; never reaches the client.
    RedactedThinking { data: String },
}

impl LlmContent {
    pub fn as_block(&self) -> Option<&ContentBlock> {
        match self {
            Self::Block(block) => Some(block),
            Self::RedactedThinking { .. } => None,
        }
    }
}

impl From<ContentBlock> for LlmContent {
    fn from(block: ContentBlock) -> Self {
        Self::Block(block)
    }
}

/// Message in the provider conversation
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: Role,
    pub content: Vec<LlmContent>,
}

impl LlmMessage {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: content.into_iter().map(LlmContent::from).collect(),
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into_iter().map(LlmContent::from).collect(),
        }
    }
}

impl From<LlmResponse> for LlmMessage {
    /// The assistant message that replays a response verbatim
    fn from(response: LlmResponse) -> Self {
        Self {
            role: Role::Assistant,
            content: response.content,
        }
    }
}

/// Tool definition
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Complete response for one model round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    /// Blocks in the order the model produced them
    pub content: Vec<LlmContent>,
    pub end_turn: bool,
    pub usage: Usage,
}

impl LlmResponse {
    /// Wire blocks, skipping provider-only content
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.content.iter().filter_map(LlmContent::as_block)
    }

    /// Extract all tool use requests from the response
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.blocks()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    /// Concatenated text content
    pub fn text(&self) -> String {
        self.blocks()
            .filter_map(|block| match block {
                ContentBlock::Text { value } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_use(&self) -> bool {
        self.blocks()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

/// Item yielded by an [`LlmStream`](super::LlmStream).
///
/// Deltas arrive as the model produces them. Every stream ends with exactly
/// one `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmStreamEvent {
    ThinkingDelta(String),
    TextDelta(String),
    Completed(LlmResponse),
    Failed(LlmError),
}

impl LlmStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_accessors() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::thinking("plan").into(),
                LlmContent::RedactedThinking {
                    data: "opaque".to_string(),
                },
                ContentBlock::text("Creating ").into(),
                ContentBlock::tool_use("t1", "instantiate_world", json!({"world_name": "Aster"})).into(),
                ContentBlock::text("now").into(),
            ],
            end_turn: false,
            usage: Usage::default(),
        };

        assert_eq!(response.text(), "Creating now");
        assert!(response.has_tool_use());
        let uses = response.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].0, "t1");
        assert_eq!(uses[0].1, "instantiate_world");
        assert_eq!(response.blocks().count(), 4);

        let replay = LlmMessage::from(response.clone());
        assert_eq!(replay.role, Role::Assistant);
        assert_eq!(replay.content, response.content);
    }
}
