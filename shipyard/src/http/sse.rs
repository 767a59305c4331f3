//! Incremental parser for `text/event-stream` bodies

/// One parsed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Joined `data:` lines
    Data(String),

    /// A `:` comment line, e.g. a heartbeat
    Comment(String),
}

/// Buffers chunks and yields complete frames
///
/// Bytes are only decoded once a whole frame has arrived, so a character
/// split across chunks survives.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        // `\r` never occurs inside a multi-byte sequence
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_frame_end(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            frames.extend(parse_block(&String::from_utf8_lossy(&block)));
        }
        frames
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

fn parse_block(block: &str) -> Vec<SseFrame> {
    let mut frames = Vec::new();
    let mut data: Option<String> = None;

    for line in block.lines() {
        if let Some(comment) = line.strip_prefix(':') {
            frames.push(SseFrame::Comment(comment.trim().to_string()));
        } else if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
        // id:, event: and retry: fields are not used by the tail
    }

    if let Some(data) = data {
        frames.push(SseFrame::Data(data));
    }
    frames
}
