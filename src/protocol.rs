//! Shared turn-protocol vocabulary
//!
//! Content blocks, replayable conversation history, and the wire events the
//! turn executor streams to the client. Both the server and the client build
//! everything they store or send out of these types.

mod content;
mod event;
mod validate;

pub use content::{ContentBlock, ConversationHistory, HistoryContent, HistoryEntry, Role};
pub use event::{ChatRequest, ErrorCode, StreamEvent, ToolCallStatus, ToolCallSummary};
pub use validate::{validate_history, ProtocolError, ToolUseLedger};
