//! Anthropic streaming event decoding
//!
//! Raw `text/event-stream` bytes are framed, each frame's JSON is decoded
//! into an [`SseEvent`], and [`StreamState`] folds those into deltas plus a
//! final [`LlmResponse`]. Content blocks are kept by their stream index so
//! the response preserves the model's order even when blocks interleave.

use super::{LlmContent, LlmError, LlmResponse, LlmStream, LlmStreamEvent, Usage};
use crate::protocol::ContentBlock;
use crate::sse::{Frame, FrameBuffer};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum SseEvent {
    MessageStart {
        message: SseMessage,
    },
    ContentBlockStart {
        index: usize,
        content_block: SseContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: SseDelta,
    },
    ContentBlockStop {
        #[allow(dead_code)]
        index: usize,
    },
    MessageDelta {
        delta: SseMessageDelta,
        #[serde(default)]
        usage: Option<SseUsageDelta>,
    },
    MessageStop,
    Ping,
    Error {
        error: SseError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(super) struct SseMessage {
    #[serde(default)]
    usage: SseUsage,
}

#[derive(Debug, Default, Deserialize)]
struct SseUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum SseContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    RedactedThinking {
        data: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum SseDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub(super) struct SseMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SseUsageDelta {
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct SseError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

impl SseError {
    fn into_llm_error(self) -> LlmError {
        let message = format!("{}: {}", self.error_type, self.message);
        match self.error_type.as_str() {
            "overloaded_error" | "api_error" => LlmError::server_error(message),
            "rate_limit_error" => LlmError::rate_limit(message),
            "authentication_error" | "permission_error" => LlmError::auth(message),
            "invalid_request_error" => LlmError::invalid_request(message),
            _ => LlmError::unknown(message),
        }
    }
}

#[derive(Debug)]
enum PartialBlock {
    Text(String),
    Thinking { text: String, signature: String },
    ToolUse { id: String, name: String, json: String },
    RedactedThinking(String),
    Skipped,
}

/// Accumulates one model round
#[derive(Debug, Default)]
pub(super) struct StreamState {
    blocks: BTreeMap<usize, PartialBlock>,
    usage: Usage,
    stop_reason: Option<String>,
}

impl StreamState {
    /// Fold one provider event, returning the event to surface if any
    pub fn process(&mut self, event: SseEvent) -> Option<LlmStreamEvent> {
        match event {
            SseEvent::MessageStart { message } => {
                self.usage.input_tokens = message.usage.input_tokens;
                self.usage.output_tokens = message.usage.output_tokens;
                self.usage.cache_creation_tokens =
                    message.usage.cache_creation_input_tokens.unwrap_or(0);
                self.usage.cache_read_tokens = message.usage.cache_read_input_tokens.unwrap_or(0);
                None
            }

            SseEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let (block, initial) = match content_block {
                    SseContentBlock::Text { text } => {
                        let initial =
                            (!text.is_empty()).then(|| LlmStreamEvent::TextDelta(text.clone()));
                        (PartialBlock::Text(text), initial)
                    }
                    SseContentBlock::Thinking { thinking } => {
                        let initial = (!thinking.is_empty())
                            .then(|| LlmStreamEvent::ThinkingDelta(thinking.clone()));
                        (
                            PartialBlock::Thinking {
                                text: thinking,
                                signature: String::new(),
                            },
                            initial,
                        )
                    }
                    SseContentBlock::ToolUse { id, name } => (
                        PartialBlock::ToolUse {
                            id,
                            name,
                            json: String::new(),
                        },
                        None,
                    ),
                    SseContentBlock::RedactedThinking { data } => {
                        (PartialBlock::RedactedThinking(data), None)
                    }
                    SseContentBlock::Unsupported => (PartialBlock::Skipped, None),
                };
                self.blocks.insert(index, block);
                initial
            }

            SseEvent::ContentBlockDelta { index, delta } => {
                let Some(block) = self.blocks.get_mut(&index) else {
                    return Some(LlmStreamEvent::Failed(LlmError::stream(format!(
                        "delta for unknown content block {index}"
                    ))));
                };
                match (block, delta) {
                    (PartialBlock::Text(text), SseDelta::TextDelta { text: chunk }) => {
                        text.push_str(&chunk);
                        Some(LlmStreamEvent::TextDelta(chunk))
                    }
                    (PartialBlock::Thinking { text, .. }, SseDelta::ThinkingDelta { thinking }) => {
                        text.push_str(&thinking);
                        Some(LlmStreamEvent::ThinkingDelta(thinking))
                    }
                    (PartialBlock::Thinking { signature, .. }, SseDelta::SignatureDelta { signature: chunk }) => {
                        signature.push_str(&chunk);
                        None
                    }
                    (PartialBlock::ToolUse { json, .. }, SseDelta::InputJsonDelta { partial_json }) => {
                        json.push_str(&partial_json);
                        None
                    }
                    _ => None,
                }
            }

            SseEvent::MessageDelta { delta, usage } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                if let Some(usage) = usage {
                    self.usage.output_tokens = usage.output_tokens;
                }
                None
            }

            SseEvent::MessageStop => Some(match self.finish() {
                Ok(response) => LlmStreamEvent::Completed(response),
                Err(e) => LlmStreamEvent::Failed(e),
            }),

            SseEvent::Error { error } => {
                tracing::warn!(
                    error_type = %error.error_type,
                    message = %error.message,
                    "Anthropic stream error"
                );
                Some(LlmStreamEvent::Failed(error.into_llm_error()))
            }

            SseEvent::ContentBlockStop { .. } | SseEvent::Ping | SseEvent::Unknown => None,
        }
    }

    fn finish(&mut self) -> Result<LlmResponse, LlmError> {
        let mut content = Vec::with_capacity(self.blocks.len());
        for block in std::mem::take(&mut self.blocks).into_values() {
            match block {
                PartialBlock::Text(text) => {
                    if !text.is_empty() {
                        content.push(ContentBlock::text(text).into());
                    }
                }
                PartialBlock::Thinking { text, signature } => {
                    content.push(
                        ContentBlock::Thinking {
                            value: text,
                            signature: (!signature.is_empty()).then_some(signature),
                        }
                        .into(),
                    );
                }
                PartialBlock::ToolUse { id, name, json } => {
                    let input = if json.trim().is_empty() {
                        Value::Object(serde_json::Map::new())
                    } else {
                        serde_json::from_str(&json).map_err(|e| {
                            LlmError::stream(format!("Invalid input for tool {name}: {e}"))
                        })?
                    };
                    content.push(ContentBlock::ToolUse { id, name, input }.into());
                }
                PartialBlock::RedactedThinking(data) => {
                    content.push(LlmContent::RedactedThinking { data });
                }
                PartialBlock::Skipped => {}
            }
        }

        Ok(LlmResponse {
            content,
            end_turn: self.stop_reason.as_deref() == Some("end_turn"),
            usage: std::mem::take(&mut self.usage),
        })
    }
}

pub(super) fn decode_frame(frame: &Frame) -> Result<Option<SseEvent>, LlmError> {
    if frame.data.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&frame.data)
        .map(Some)
        .map_err(|e| LlmError::stream(format!("Malformed stream event: {e}")))
}

struct Cursor<S> {
    bytes: std::pin::Pin<Box<S>>,
    frames: FrameBuffer,
    state: StreamState,
    pending: VecDeque<LlmStreamEvent>,
    terminal_queued: bool,
    done: bool,
}

impl<S> Cursor<S> {
    fn queue(&mut self, event: LlmStreamEvent) {
        if self.terminal_queued {
            return;
        }
        self.terminal_queued = event.is_terminal();
        self.pending.push_back(event);
    }

    fn handle_frame(&mut self, frame: Frame) {
        match decode_frame(&frame) {
            Ok(Some(event)) => {
                if let Some(out) = self.state.process(event) {
                    self.queue(out);
                }
            }
            Ok(None) => {}
            Err(e) => self.queue(LlmStreamEvent::Failed(e)),
        }
    }
}

/// Turn a provider byte stream into an [`LlmStream`].
///
/// The stream always ends with exactly one terminal event; a body that ends
/// before `message_stop` yields [`LlmStreamEvent::Failed`].
pub(super) fn decode_stream<S, B, E>(bytes: S) -> LlmStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let cursor = Cursor {
        bytes: Box::pin(bytes),
        frames: FrameBuffer::new(),
        state: StreamState::default(),
        pending: VecDeque::new(),
        terminal_queued: false,
        done: false,
    };

    Box::pin(futures::stream::unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(event) = cursor.pending.pop_front() {
                if event.is_terminal() {
                    cursor.done = true;
                }
                return Some((event, cursor));
            }
            if cursor.done || cursor.terminal_queued {
                return None;
            }

            match cursor.bytes.next().await {
                Some(Ok(chunk)) => {
                    for frame in cursor.frames.push(chunk.as_ref()) {
                        cursor.handle_frame(frame);
                    }
                }
                Some(Err(e)) => cursor.queue(LlmStreamEvent::Failed(e.into())),
                None => {
                    if let Some(frame) = cursor.frames.finish() {
                        cursor.handle_frame(frame);
                    }
                    cursor.queue(LlmStreamEvent::Failed(LlmError::stream(
                        "Stream ended before message_stop",
                    )));
                }
            }
        }
    }))
}
