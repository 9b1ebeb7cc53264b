//! Content blocks and conversation history entries

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Smallest typed unit of assistant output.
///
/// Serialized with an explicit `type` tag so both ends can match
/// exhaustively. `text` and `thinking` are accepted as aliases for `value`
/// when reading provider-shaped history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(alias = "text")]
        value: String,
    },
    Thinking {
        #[serde(alias = "thinking")]
        value: String,
        /// Provider signature, required to replay the block to the model
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        ContentBlock::Text {
            value: value.into(),
        }
    }

    pub fn thinking(value: impl Into<String>) -> Self {
        ContentBlock::Thinking {
            value: value.into(),
            signature: None,
        }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }

    /// Text or thinking with nothing but whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            ContentBlock::Text { value } | ContentBlock::Thinking { value, .. } => {
                value.trim().is_empty()
            }
            ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. } => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
        }
    }
}

/// Content of one replayed message: plain text or structured blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl HistoryContent {
    pub fn is_empty(&self) -> bool {
        match self {
            HistoryContent::Text(text) => text.trim().is_empty(),
            HistoryContent::Blocks(blocks) => blocks.iter().all(ContentBlock::is_blank),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            HistoryContent::Text(_) => &[],
            HistoryContent::Blocks(blocks) => blocks,
        }
    }
}

/// One prior message, reduced for replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: HistoryContent,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: HistoryContent::Text(text.into()),
        }
    }

    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: HistoryContent::Blocks(blocks),
        }
    }
}

/// Ordered replay payload sent with each user turn
pub type ConversationHistory = Vec<HistoryEntry>;
