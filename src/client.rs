//! Chat client
//!
//! Consumes a turn's event stream and rebuilds the assistant message
//! ([`TurnAssembler`]), keeps the session's messages ([`ConversationLog`]),
//! and packages them as replayable history for the next turn
//! ([`reconcile`]).

mod assembler;
mod conversation;
mod decoder;
mod history;
mod message;
mod transport;

#[cfg(test)]
mod proptests;

pub use assembler::{AssemblyError, TurnAssembler};
pub use conversation::ConversationLog;
pub use decoder::EventDecoder;
pub use history::reconcile;
pub use message::{AssistantContent, Message, MessageBody, Phase, TurnFailure};
pub use transport::{ChatClient, ClientError};
