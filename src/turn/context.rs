//! Conversation history to provider messages

use crate::llm::LlmMessage;
use crate::protocol::{ContentBlock, HistoryContent, HistoryEntry, Role};
use std::collections::HashSet;

/// Build the provider message list for a new user turn.
///
/// Assistant entries are split so `tool_result` blocks travel in user
/// messages right after the assistant message holding their `tool_use`.
/// A `tool_use` with no result in the same entry is dropped, as is blank
/// text. Adjacent messages with the same role are merged.
pub fn build_llm_messages(history: &[HistoryEntry], content: &str) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = Vec::with_capacity(history.len() + 1);

    for entry in history {
        match &entry.content {
            HistoryContent::Text(text) => {
                push_block(&mut messages, entry.role, ContentBlock::text(text.clone()));
            }
            HistoryContent::Blocks(blocks) => {
                let answered: HashSet<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                        _ => None,
                    })
                    .collect();

                for block in blocks {
                    let role = match block {
                        ContentBlock::ToolResult { .. } => Role::User,
                        ContentBlock::ToolUse { id, .. } if !answered.contains(id.as_str()) => {
                            continue;
                        }
                        _ => entry.role,
                    };
                    push_block(&mut messages, role, block.clone());
                }
            }
        }
    }

    push_block(&mut messages, Role::User, ContentBlock::text(content));
    messages
}

fn push_block(messages: &mut Vec<LlmMessage>, role: Role, block: ContentBlock) {
    if block.is_blank() {
        return;
    }
    match messages.last_mut() {
        Some(last) if last.role == role => last.content.push(block.into()),
        _ => messages.push(LlmMessage {
            role,
            content: vec![block.into()],
        }),
    }
}
