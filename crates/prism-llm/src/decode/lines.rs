/// Frames a raw byte stream into complete JSON lines
///
/// Ollama streams one JSON object per line with no SSE envelope. Bytes are
/// buffered until a newline arrives; the trailing partial line is retained
/// for the next read, and blank lines are discarded. Splitting happens on
/// the byte level so a UTF-8 sequence straddling a read boundary stays in
/// the buffer until its line completes.
#[derive(Debug, Default)]
pub struct JsonLineFramer {
    buffer: Vec<u8>,
}

impl JsonLineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every line completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_owned());
            }
        }
        lines
    }

    /// Drain any final unterminated line at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.buffer).trim().to_owned();
        self.buffer.clear();
        if text.is_empty() { None } else { Some(text) }
    }
}
