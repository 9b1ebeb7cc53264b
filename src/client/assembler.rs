//! Turn assembler
//!
//! Rebuilds one assistant message from the turn's event stream:
//!
//! ```text
//! pending --thinking--> thinking --content--> speaking --tools--> awaiting_tools --end--> done
//!    any non-terminal phase --error--> failed
//! ```
//!
//! Deltas after a `tools` event keep appending to the same buffers and move
//! the phase back to thinking or speaking. Once the message is done or
//! failed every further event is rejected and the message is left as is.

use super::message::{AssistantContent, Message, MessageBody, Phase, TurnFailure};
use crate::protocol::{ContentBlock, ProtocolError, Role, StreamEvent, ToolUseLedger};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("no turn in flight for message {0}")]
    UnknownTurn(Uuid),
    #[error("a turn is already in flight")]
    TurnInFlight,
}

/// Owns the in-progress assistant message for one turn
#[derive(Debug, Clone)]
pub struct TurnAssembler {
    id: Uuid,
    created_at: DateTime<Utc>,
    phase: Phase,
    content: AssistantContent,
    /// Tool uses from ancestor turns, for checking snapshots
    ledger: ToolUseLedger,
    /// Content blocks from the latest `tools` event
    snapshot: Option<Vec<ContentBlock>>,
}

impl TurnAssembler {
    pub fn new(ledger: ToolUseLedger) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            phase: Phase::Pending,
            content: AssistantContent::default(),
            ledger,
            snapshot: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn content(&self) -> &AssistantContent {
        &self.content
    }

    /// Live view for rendering
    pub fn snapshot(&self) -> Message {
        self.clone().into_message()
    }

    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            role: Role::Assistant,
            body: MessageBody::Assistant(self.content),
            created_at: self.created_at,
            phase: self.phase,
        }
    }

    /// Apply one event and return the resulting phase.
    ///
    /// A `tools` snapshot whose results answer unknown tool uses fails the
    /// message and is reported as an error.
    pub fn apply(&mut self, event: StreamEvent) -> Result<Phase, AssemblyError> {
        if self.phase.is_terminal() {
            return Err(ProtocolError::EventAfterTerminal {
                event: event.name(),
            }
            .into());
        }

        match event {
            StreamEvent::ThinkingDelta { content } => {
                self.content.thinking.push_str(&content);
                self.phase = Phase::Thinking;
            }
            StreamEvent::ContentDelta { content } => {
                self.content.text.push_str(&content);
                self.phase = Phase::Speaking;
            }
            StreamEvent::Tools {
                tool_calls,
                files_created,
                content_blocks,
            } => {
                if let Err(e) = self.ledger.check(&content_blocks) {
                    self.fail(TurnFailure::protocol(&e));
                    return Err(e.into());
                }
                self.content.tool_calls = tool_calls;
                self.content.files_created = files_created;
                self.snapshot = Some(content_blocks);
                self.phase = Phase::AwaitingTools;
            }
            StreamEvent::End => {
                self.freeze();
                self.phase = Phase::Done;
            }
            StreamEvent::Error { error, code } => {
                self.fail(TurnFailure::new(code, error));
            }
        }

        Ok(self.phase)
    }

    /// The stream closed; fail the message unless it already finished.
    ///
    /// Returns true if this call ended the turn.
    pub fn interrupt(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.fail(TurnFailure::connection_interrupted());
        true
    }

    /// Fail the message with the given reason unless it already finished
    pub fn fail(&mut self, failure: TurnFailure) {
        if self.phase.is_terminal() {
            return;
        }
        self.freeze();
        self.content.error = Some(failure);
        self.phase = Phase::Failed;
    }

    /// Last snapshot wins; otherwise the buffers, thinking first
    fn freeze(&mut self) {
        let blocks = self.snapshot.take().unwrap_or_else(|| {
            let content = &self.content;
            [
                ContentBlock::thinking(content.thinking.clone()),
                ContentBlock::text(content.text.clone()),
            ]
            .into_iter()
            .filter(|block| !block.is_blank())
            .collect()
        });
        self.content.content_blocks = blocks;
    }
}
