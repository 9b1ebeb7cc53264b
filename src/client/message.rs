//! Client-visible messages

use crate::protocol::{ContentBlock, ErrorCode, ProtocolError, Role, ToolCallSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Construction phase of an assistant message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Thinking,
    Speaking,
    AwaitingTools,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Thinking => "thinking",
            Phase::Speaking => "speaking",
            Phase::AwaitingTools => "awaiting_tools",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

/// Why a turn ended without an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct TurnFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl TurnFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn connection_interrupted() -> Self {
        Self::new(
            ErrorCode::ConnectionInterrupted,
            "Connection interrupted before the turn completed",
        )
    }

    pub fn protocol(error: &ProtocolError) -> Self {
        Self::new(ErrorCode::ProtocolViolation, error.to_string())
    }

    /// Whether resending the same message may succeed
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Everything accumulated for one assistant turn
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssistantContent {
    /// Running thinking buffer, never reset within a turn
    pub thinking: String,
    /// Running spoken-text buffer, never reset within a turn
    pub text: String,
    pub tool_calls: Vec<ToolCallSummary>,
    pub files_created: Vec<String>,
    /// Frozen when the turn ends
    pub content_blocks: Vec<ContentBlock>,
    pub error: Option<TurnFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    User { raw_text: String },
    Assistant(AssistantContent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
}

impl Message {
    /// User messages are complete as soon as they exist
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            body: MessageBody::User {
                raw_text: text.into(),
            },
            created_at: Utc::now(),
            phase: Phase::Done,
        }
    }

    pub fn assistant_content(&self) -> Option<&AssistantContent> {
        match &self.body {
            MessageBody::Assistant(content) => Some(content),
            MessageBody::User { .. } => None,
        }
    }

    /// Still being streamed
    pub fn is_in_flight(&self) -> bool {
        !self.phase.is_terminal()
    }

    pub fn failure(&self) -> Option<&TurnFailure> {
        self.assistant_content().and_then(|c| c.error.as_ref())
    }
}
