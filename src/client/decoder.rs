//! Turn event decoding from `text/event-stream` bytes

use crate::protocol::{ProtocolError, StreamEvent};
use crate::sse::{Frame, FrameBuffer};

/// Turns response body chunks into protocol events
#[derive(Debug, Default)]
pub struct EventDecoder {
    frames: FrameBuffer,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every event completed by this chunk
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, ProtocolError>> {
        self.frames
            .push(chunk)
            .into_iter()
            .filter_map(|frame| decode(&frame))
            .collect()
    }

    /// Decode a trailing event left when the body ended
    pub fn finish(&mut self) -> Option<Result<StreamEvent, ProtocolError>> {
        self.frames.finish().and_then(|frame| decode(&frame))
    }
}

/// Frames without data carry no event
fn decode(frame: &Frame) -> Option<Result<StreamEvent, ProtocolError>> {
    if frame.data.trim().is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(&frame.data)
            .map_err(|e| ProtocolError::MalformedEvent(e.to_string())),
    )
}
