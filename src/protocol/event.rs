//! Wire events and the per-turn request

use super::content::{ContentBlock, HistoryEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Request to run one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
}

/// Lifecycle of a single tool invocation as shown to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

/// One entry of the `tool_calls` list in a `tools` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSummary {
    #[serde(default)]
    pub id: String,
    pub tool: String,
    pub input: Value,
    #[serde(default)]
    pub status: ToolCallStatus,
}

impl ToolCallSummary {
    pub fn running(id: impl Into<String>, tool: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            input,
            status: ToolCallStatus::Running,
        }
    }
}

/// Machine-readable reason attached to `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    LlmFailure,
    ToolLoopExceeded,
    ProtocolViolation,
    ConnectionInterrupted,
    #[default]
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::LlmFailure => "llm_failure",
            ErrorCode::ToolLoopExceeded => "tool_loop_exceeded",
            ErrorCode::ProtocolViolation => "protocol_violation",
            ErrorCode::ConnectionInterrupted => "connection_interrupted",
            ErrorCode::Internal => "internal",
        }
    }

    /// Failures the user can fix by simply sending the message again
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::LlmFailure | ErrorCode::ConnectionInterrupted
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event streamed from the turn executor to the client.
///
/// Exactly one `End` or `Error` terminates a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    #[serde(rename = "thinking")]
    ThinkingDelta { content: String },
    #[serde(rename = "content")]
    ContentDelta { content: String },
    /// Full snapshot of the turn's tool activity, not a delta
    Tools {
        tool_calls: Vec<ToolCallSummary>,
        #[serde(default)]
        files_created: Vec<String>,
        #[serde(default)]
        content_blocks: Vec<ContentBlock>,
    },
    Error {
        error: String,
        #[serde(default)]
        code: ErrorCode,
    },
    End,
}

impl StreamEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: message.into(),
            code,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End | StreamEvent::Error { .. })
    }

    /// Wire tag of the event
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::ThinkingDelta { .. } => "thinking",
            StreamEvent::ContentDelta { .. } => "content",
            StreamEvent::Tools { .. } => "tools",
            StreamEvent::Error { .. } => "error",
            StreamEvent::End => "end",
        }
    }
}
