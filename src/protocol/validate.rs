//! Protocol validation
//!
//! A `tool_result` may only answer a `tool_use` emitted earlier in the same
//! turn or in an ancestor turn. Anything else is an orphan and is rejected
//! rather than rendered or replayed.

use super::content::{ContentBlock, HistoryEntry};
use super::event::ChatRequest;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("tool_result references unknown tool_use id {0:?}")]
    OrphanToolResult(String),
    #[error("message content must not be empty")]
    EmptyContent,
    #[error("history entry {index} has no content")]
    EmptyHistoryEntry { index: usize },
    #[error("malformed event: {0}")]
    MalformedEvent(String),
    #[error("{event} event received after the turn ended")]
    EventAfterTerminal { event: &'static str },
}

/// Tool-use ids seen so far, in causal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolUseLedger {
    seen: HashSet<String>,
}

impl ToolUseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger of every tool_use id in the given history
    pub fn from_history(history: &[HistoryEntry]) -> Result<Self, ProtocolError> {
        let mut ledger = Self::new();
        for entry in history {
            ledger.record(entry.content.blocks())?;
        }
        Ok(ledger)
    }

    /// Walk blocks in order, recording tool uses and checking tool results
    pub fn record(&mut self, blocks: &[ContentBlock]) -> Result<(), ProtocolError> {
        for block in blocks {
            match block {
                ContentBlock::ToolUse { id, .. } => {
                    self.seen.insert(id.clone());
                }
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    if !self.seen.contains(tool_use_id) {
                        return Err(ProtocolError::OrphanToolResult(tool_use_id.clone()));
                    }
                }
                ContentBlock::Text { .. } | ContentBlock::Thinking { .. } => {}
            }
        }
        Ok(())
    }

    /// Check a full turn snapshot without mutating the ledger
    pub fn check(&self, blocks: &[ContentBlock]) -> Result<(), ProtocolError> {
        self.clone().record(blocks)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}

/// Validate a replayed history: no orphan tool results, no blank entries
pub fn validate_history(history: &[HistoryEntry]) -> Result<(), ProtocolError> {
    if let Some(index) = history.iter().position(|entry| entry.content.is_empty()) {
        return Err(ProtocolError::EmptyHistoryEntry { index });
    }
    ToolUseLedger::from_history(history).map(|_| ())
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.content.trim().is_empty() {
            return Err(ProtocolError::EmptyContent);
        }
        validate_history(&self.conversation_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_turn(id: &str) -> HistoryEntry {
        HistoryEntry::assistant_blocks(vec![
            ContentBlock::text("Creating it now"),
            ContentBlock::tool_use(id, "instantiate_world", json!({})),
            ContentBlock::tool_result(id, "Created world: worlds/x", false),
        ])
    }

    #[test]
    fn test_result_in_same_turn_is_accepted() {
        assert!(validate_history(&[HistoryEntry::user("make a world"), tool_turn("t1")]).is_ok());
    }

    #[test]
    fn test_result_may_answer_ancestor_turn() {
        let history = vec![
            HistoryEntry::assistant_blocks(vec![ContentBlock::tool_use("t1", "x", json!({}))]),
            HistoryEntry::assistant_blocks(vec![ContentBlock::tool_result("t1", "ok", false)]),
        ];
        assert!(validate_history(&history).is_ok());
    }

    #[test]
    fn test_orphan_result_is_rejected() {
        let history = vec![HistoryEntry::assistant_blocks(vec![
            ContentBlock::tool_result("ghost", "ok", false),
        ])];
        assert_eq!(
            validate_history(&history),
            Err(ProtocolError::OrphanToolResult("ghost".to_string()))
        );
    }

    #[test]
    fn test_result_before_its_use_is_rejected() {
        let history = vec![HistoryEntry::assistant_blocks(vec![
            ContentBlock::tool_result("t1", "ok", false),
            ContentBlock::tool_use("t1", "x", json!({})),
        ])];
        assert!(matches!(
            validate_history(&history),
            Err(ProtocolError::OrphanToolResult(_))
        ));
    }

    #[test]
    fn test_blank_history_entry_is_rejected() {
        let history = vec![HistoryEntry::user("hi"), HistoryEntry::user("   ")];
        assert_eq!(
            validate_history(&history),
            Err(ProtocolError::EmptyHistoryEntry { index: 1 })
        );
    }

    #[test]
    fn test_check_does_not_mutate() {
        let ledger = ToolUseLedger::new();
        assert!(ledger
            .check(&[
                ContentBlock::tool_use("t9", "x", json!({})),
                ContentBlock::tool_result("t9", "ok", false)
            ])
            .is_ok());
        assert!(!ledger.contains("t9"));
    }

    #[test]
    fn test_request_requires_content() {
        let request = ChatRequest {
            content: " ".to_string(),
            conversation_history: vec![],
        };
        assert_eq!(request.validate(), Err(ProtocolError::EmptyContent));
    }
}
