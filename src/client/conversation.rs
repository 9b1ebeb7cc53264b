//! Session conversation log
//!
//! Holds the finished messages of a session plus at most one turn in flight.
//! Only the assembler of the in-flight turn mutates it, and only through
//! calls carrying that turn's message id.

use super::assembler::{AssemblyError, TurnAssembler};
use super::history::reconcile;
use super::message::{Message, Phase, TurnFailure};
use crate::protocol::{ChatRequest, HistoryEntry, StreamEvent, ToolUseLedger};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
    in_flight: Option<TurnAssembler>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the user's message and open an assistant turn for it.
    ///
    /// Returns the new turn's message id and the request to send.
    pub fn begin_turn(&mut self, content: &str) -> Result<(Uuid, ChatRequest), AssemblyError> {
        if self.in_flight.is_some() {
            return Err(AssemblyError::TurnInFlight);
        }

        let history = self.history();
        let ledger = ToolUseLedger::from_history(&history)?;
        self.messages.push(Message::user(content));

        let assembler = TurnAssembler::new(ledger);
        let id = assembler.id();
        self.in_flight = Some(assembler);

        Ok((
            id,
            ChatRequest {
                content: content.to_string(),
                conversation_history: history,
            },
        ))
    }

    /// Apply an event to the in-flight turn identified by `id`
    pub fn apply(&mut self, id: Uuid, event: StreamEvent) -> Result<Phase, AssemblyError> {
        let assembler = self.assembler_mut(id)?;
        let result = assembler.apply(event);
        self.settle();
        result
    }

    /// The turn's stream closed. Returns true if that ended the turn.
    pub fn interrupt(&mut self, id: Uuid) -> Result<bool, AssemblyError> {
        let interrupted = self.assembler_mut(id)?.interrupt();
        self.settle();
        Ok(interrupted)
    }

    /// Fail the in-flight turn, e.g. when the request could not be sent
    pub fn fail(&mut self, id: Uuid, failure: TurnFailure) -> Result<(), AssemblyError> {
        self.assembler_mut(id)?.fail(failure);
        self.settle();
        Ok(())
    }

    /// Finished messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn in_flight(&self) -> Option<&TurnAssembler> {
        self.in_flight.as_ref()
    }

    /// Finished messages followed by a snapshot of the in-flight one
    pub fn display(&self) -> Vec<Message> {
        let mut all = self.messages.clone();
        all.extend(self.in_flight.as_ref().map(TurnAssembler::snapshot));
        all
    }

    /// Replay payload for the next turn
    pub fn history(&self) -> Vec<HistoryEntry> {
        reconcile(&self.messages)
    }

    fn assembler_mut(&mut self, id: Uuid) -> Result<&mut TurnAssembler, AssemblyError> {
        self.in_flight
            .as_mut()
            .filter(|assembler| assembler.id() == id)
            .ok_or(AssemblyError::UnknownTurn(id))
    }

    /// Move a finished turn into the log
    fn settle(&mut self) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|assembler| assembler.phase().is_terminal())
        {
            if let Some(assembler) = self.in_flight.take() {
                self.messages.push(assembler.into_message());
            }
        }
    }
}
