//! Incremental `text/event-stream` framing
//!
//! Shared by the Anthropic provider (reading the model stream) and the chat
//! client (reading turn events). Bytes are buffered until a blank line closes
//! a frame so multi-byte characters split across chunks decode intact.

/// One parsed SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, separator)) = find_boundary(&self.buf) {
            let raw: Vec<u8> = self.buf.drain(..end + separator).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw[..end])) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame that was not closed by a blank line
    pub fn finish(&mut self) -> Option<Frame> {
        let raw = std::mem::take(&mut self.buf);
        parse_frame(&String::from_utf8_lossy(&raw))
    }
}

/// Position and length of the first frame separator
fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|pos| (pos, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_frame(raw: &str) -> Option<Frame> {
    let mut event = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if event.is_none() && data_lines.is_empty() {
        return None;
    }

    Some(Frame {
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"event: message_start\nda").is_empty());

        let frames = buffer.push(b"ta: {\"a\":1}\n\nevent: ping\ndata: {}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("message_start"));
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(frames[1].event.as_deref(), Some("ping"));
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let payload = "data: {\"content\":\"héllo ✨\"}\n\n".as_bytes();
        let split = payload
            .iter()
            .position(|b| *b == 0xE2)
            .expect("sparkle lead byte")
            + 1;

        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(&payload[..split]).is_empty());
        let frames = buffer.push(&payload[split..]);
        assert_eq!(frames[0].data, "{\"content\":\"héllo ✨\"}");
    }

    #[test]
    fn test_comments_and_keepalives_are_skipped() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b": ping\n\ndata: {\"type\":\"end\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, None);
        assert_eq!(frames[0].data, "{\"type\":\"end\"}");
    }

    #[test]
    fn test_crlf_separators() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"data: one\r\n\r\ndata: two\r\n\r\n");
        let data: Vec<_> = frames.into_iter().map(|f| f.data).collect();
        assert_eq!(data, vec!["one", "two"]);
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"data: a\ndata: b\n\n");
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"data: tail").is_empty());
        assert_eq!(buffer.finish().map(|f| f.data).as_deref(), Some("tail"));
        assert_eq!(buffer.finish(), None);
    }
}
