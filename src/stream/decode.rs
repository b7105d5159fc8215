//! Incremental SSE frame splitting (bytes -> data payloads).
//!
//! Frames are delimited by a blank line; a frame's payload is its text with
//! the `data:` prefix stripped. Comment frames (leading `:`) and empty
//! frames are skipped. Chunk boundaries never split a frame's delivery;
//! partial input stays buffered until its delimiter arrives.

const DELIMITER: &str = "\n\n";

/// Push-based frame buffer for a server-push byte stream.
#[derive(Debug, Default)]
pub struct SseFrames {
    buf: String,
}

impl SseFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk (lossy UTF-8, matching wire reality).
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
    }

    /// Next complete frame payload, if one is buffered.
    pub fn next_payload(&mut self) -> Option<String> {
        while let Some(idx) = self.buf.find(DELIMITER) {
            let frame = self.buf[..idx].to_string();
            self.buf.drain(..idx + DELIMITER.len());
            if let Some(payload) = payload_of(&frame) {
                return Some(payload);
            }
        }
        None
    }

    /// Drain whatever remains at end of stream as a final payload.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        payload_of(&rest)
    }
}

fn payload_of(frame: &str) -> Option<String> {
    let trimmed = frame.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    let payload = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))
        .unwrap_or(trimmed);
    Some(payload.trim_start().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut frames = SseFrames::new();
        frames.push(b"data: {\"progress\":10}\n\n");
        assert_eq!(frames.next_payload().as_deref(), Some("{\"progress\":10}"));
        assert!(frames.next_payload().is_none());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut frames = SseFrames::new();
        frames.push(b"data: {\"pro");
        assert!(frames.next_payload().is_none());
        frames.push(b"gress\":55}\n\nda");
        assert_eq!(frames.next_payload().as_deref(), Some("{\"progress\":55}"));
        frames.push(b"ta: {\"done\":true}\n\n");
        assert_eq!(frames.next_payload().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn test_comment_frames_skipped() {
        let mut frames = SseFrames::new();
        frames.push(b": keep-alive\n\ndata: {\"x\":1}\n\n");
        assert_eq!(frames.next_payload().as_deref(), Some("{\"x\":1}"));
    }

    #[test]
    fn test_prefix_without_space() {
        let mut frames = SseFrames::new();
        frames.push(b"data:{\"x\":2}\n\n");
        assert_eq!(frames.next_payload().as_deref(), Some("{\"x\":2}"));
    }

    #[test]
    fn test_finish_drains_trailing_frame() {
        let mut frames = SseFrames::new();
        frames.push(b"data: {\"final\":true}");
        assert!(frames.next_payload().is_none());
        assert_eq!(frames.finish().as_deref(), Some("{\"final\":true}"));
        assert!(frames.finish().is_none());
    }
}
