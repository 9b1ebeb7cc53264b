//! Property-based tests for the assembler and reconciler
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::history::reconcile;
use super::message::{Message, Phase};
use super::TurnAssembler;
use crate::protocol::{ContentBlock, ErrorCode, StreamEvent, ToolCallSummary, ToolUseLedger};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_delta() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        "[a-zA-Z .\n]{0,12}".prop_map(|content| StreamEvent::ThinkingDelta { content }),
        "[a-zA-Z .\n]{0,12}".prop_map(|content| StreamEvent::ContentDelta { content }),
    ]
}

/// Snapshot whose tool results all answer tool uses in the same payload
fn arb_tools() -> impl Strategy<Value = StreamEvent> {
    (
        prop::collection::vec(("[a-z]{6}", "[a-zA-Z ]{0,20}", any::<bool>()), 0..3),
        "[a-zA-Z ]{0,20}",
    )
        .prop_map(|(calls, text)| {
            let mut blocks = vec![ContentBlock::text(text)];
            let mut summaries = Vec::new();
            for (id, output, is_error) in calls {
                blocks.push(ContentBlock::tool_use(&id, "create_taxonomy", json!({})));
                blocks.push(ContentBlock::tool_result(&id, output, is_error));
                summaries.push(ToolCallSummary::running(id, "create_taxonomy", json!({})));
            }
            StreamEvent::Tools {
                tool_calls: summaries,
                files_created: vec![],
                content_blocks: blocks,
            }
        })
}

fn arb_event() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![4 => arb_delta(), 1 => arb_tools()]
}

fn arb_terminal() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        Just(StreamEvent::End),
        "[a-z ]{1,20}".prop_map(|error| StreamEvent::error(ErrorCode::LlmFailure, error)),
    ]
}

fn assemble(events: &[StreamEvent]) -> TurnAssembler {
    let mut assembler = TurnAssembler::new(ToolUseLedger::new());
    for event in events {
        assembler.apply(event.clone()).unwrap();
    }
    assembler
}

fn last_snapshot(events: &[StreamEvent]) -> Option<Vec<ContentBlock>> {
    events.iter().rev().find_map(|event| match event {
        StreamEvent::Tools { content_blocks, .. } => Some(content_blocks.clone()),
        _ => None,
    })
}

fn joined(events: &[StreamEvent], thinking: bool) -> String {
    events
        .iter()
        .filter_map(|event| match (event, thinking) {
            (StreamEvent::ThinkingDelta { content }, true)
            | (StreamEvent::ContentDelta { content }, false) => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// A finished conversation: user/assistant pairs
fn arb_history() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(
        (
            "[a-z ]{0,10}",
            prop::collection::vec(arb_event(), 0..6),
            arb_terminal(),
        ),
        0..4,
    )
    .prop_map(|turns| {
        let mut messages = Vec::new();
        for (user, mut events, terminal) in turns {
            messages.push(Message::user(user));
            events.push(terminal);
            messages.push(assemble(&events).into_message());
        }
        messages
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn end_freezes_last_snapshot_or_buffers(events in prop::collection::vec(arb_event(), 0..12)) {
        let mut assembler = assemble(&events);
        prop_assert_eq!(assembler.apply(StreamEvent::End), Ok(Phase::Done));

        let content = assembler.content();
        match last_snapshot(&events) {
            Some(blocks) => prop_assert_eq!(&content.content_blocks, &blocks),
            None => {
                let expected: Vec<ContentBlock> = [
                    ContentBlock::thinking(joined(&events, true)),
                    ContentBlock::text(joined(&events, false)),
                ]
                .into_iter()
                .filter(|block| !block.is_blank())
                .collect();
                prop_assert_eq!(&content.content_blocks, &expected);
            }
        }
    }

    #[test]
    fn buffers_concatenate_every_delta(events in prop::collection::vec(arb_event(), 0..12)) {
        let assembler = assemble(&events);
        prop_assert_eq!(&assembler.content().thinking, &joined(&events, true));
        prop_assert_eq!(&assembler.content().text, &joined(&events, false));
    }

    #[test]
    fn nothing_is_accepted_after_terminal(
        events in prop::collection::vec(arb_event(), 0..6),
        terminal in arb_terminal(),
        late in prop::collection::vec(prop_oneof![arb_event(), arb_terminal()], 1..4),
    ) {
        let mut assembler = assemble(&events);
        assembler.apply(terminal).unwrap();
        let frozen = assembler.snapshot();

        for event in late {
            prop_assert!(assembler.apply(event).is_err());
        }
        prop_assert!(!assembler.interrupt());
        prop_assert_eq!(assembler.snapshot(), frozen);
    }

    #[test]
    fn interrupt_always_terminates(events in prop::collection::vec(arb_event(), 0..8)) {
        let mut assembler = assemble(&events);
        prop_assert!(assembler.interrupt());
        prop_assert_eq!(assembler.phase(), Phase::Failed);
        prop_assert_eq!(
            assembler.content().error.as_ref().map(|f| f.code),
            Some(ErrorCode::ConnectionInterrupted)
        );
    }

    #[test]
    fn reconcile_ignores_in_flight_turn(
        history in arb_history(),
        partial in prop::collection::vec(arb_event(), 0..6),
    ) {
        let mut with_in_flight = history.clone();
        with_in_flight.push(assemble(&partial).snapshot());
        prop_assert_eq!(reconcile(&with_in_flight), reconcile(&history));
    }

    #[test]
    fn reconciled_history_is_replayable(history in arb_history()) {
        let entries = reconcile(&history);
        prop_assert!(entries.len() <= history.len());
        prop_assert!(entries.iter().all(|entry| !entry.content.is_empty()));
        prop_assert!(crate::protocol::validate_history(&entries).is_ok());
    }
}
