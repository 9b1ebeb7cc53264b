//! History reconciliation
//!
//! Reduces the conversation log to the replay payload sent with the next
//! user turn.

use super::message::{Message, MessageBody, Phase};
use crate::protocol::{ContentBlock, HistoryContent, HistoryEntry};

/// Replayable history for the given messages, in order.
///
/// In-flight messages and messages that resolve to nothing are skipped.
/// Finished assistant turns replay their content blocks, or their text when
/// they produced no blocks. Failed turns replay only the text they managed to
/// speak, since their blocks may hold tool uses that were never answered.
pub fn reconcile(messages: &[Message]) -> Vec<HistoryEntry> {
    messages.iter().filter_map(resolve).collect()
}

fn resolve(message: &Message) -> Option<HistoryEntry> {
    if message.is_in_flight() {
        return None;
    }

    let content = match &message.body {
        MessageBody::User { raw_text } => HistoryContent::Text(raw_text.clone()),
        MessageBody::Assistant(content) => {
            let blocks: Vec<ContentBlock> = content
                .content_blocks
                .iter()
                .filter(|block| !block.is_blank())
                .cloned()
                .collect();

            if message.phase == Phase::Done && !blocks.is_empty() {
                HistoryContent::Blocks(blocks)
            } else {
                HistoryContent::Text(content.text.clone())
            }
        }
    };

    if content.is_empty() {
        return None;
    }
    Some(HistoryEntry {
        role: message.role,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TurnAssembler;
    use crate::protocol::{ErrorCode, Role, StreamEvent, ToolUseLedger};
    use serde_json::json;

    fn finished(events: Vec<StreamEvent>) -> Message {
        let mut assembler = TurnAssembler::new(ToolUseLedger::new());
        for event in events {
            assembler.apply(event).unwrap();
        }
        assembler.into_message()
    }

    fn content(s: &str) -> StreamEvent {
        StreamEvent::ContentDelta {
            content: s.to_string(),
        }
    }

    #[test]
    fn test_done_turn_prefers_blocks() {
        let blocks = vec![
            ContentBlock::tool_use("t1", "instantiate_world", json!({})),
            ContentBlock::tool_result("t1", "Created world: worlds/isles", false),
            ContentBlock::text("Ready"),
        ];
        let messages = vec![
            Message::user("make a world"),
            finished(vec![
                StreamEvent::Tools {
                    tool_calls: vec![],
                    files_created: vec![],
                    content_blocks: blocks.clone(),
                },
                StreamEvent::End,
            ]),
        ];

        assert_eq!(
            reconcile(&messages),
            vec![
                HistoryEntry::user("make a world"),
                HistoryEntry::assistant_blocks(blocks)
            ]
        );
    }

    #[test]
    fn test_failed_turn_replays_spoken_text() {
        let failed = finished(vec![
            content("Partial answer"),
            StreamEvent::error(ErrorCode::LlmFailure, "overloaded"),
        ]);
        assert_eq!(
            reconcile(&[failed]),
            vec![HistoryEntry {
                role: Role::Assistant,
                content: HistoryContent::Text("Partial answer".to_string()),
            }]
        );
    }

    #[test]
    fn test_empty_and_in_flight_messages_are_dropped() {
        let empty = finished(vec![StreamEvent::End]);
        let failed_silently = finished(vec![StreamEvent::error(ErrorCode::Internal, "boom")]);

        let mut in_flight = TurnAssembler::new(ToolUseLedger::new());
        in_flight.apply(content("still going")).unwrap();

        let messages = vec![
            Message::user("   "),
            empty,
            failed_silently,
            in_flight.snapshot(),
        ];
        assert!(reconcile(&messages).is_empty());
    }

    #[test]
    fn test_blank_blocks_are_filtered() {
        let done = finished(vec![
            StreamEvent::Tools {
                tool_calls: vec![],
                files_created: vec![],
                content_blocks: vec![ContentBlock::text(" "), ContentBlock::text("Hi")],
            },
            StreamEvent::End,
        ]);
        assert_eq!(
            reconcile(&[done]),
            vec![HistoryEntry::assistant_blocks(vec![ContentBlock::text("Hi")])]
        );
    }
}
