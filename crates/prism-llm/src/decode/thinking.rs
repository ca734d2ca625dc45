use crate::types::ChatEvent;

/// Default inline reasoning tag pair
pub const THINK_OPEN: &str = "<think>";
/// Closing counterpart of [`THINK_OPEN`]
pub const THINK_CLOSE: &str = "</think>";

/// Segment of scanned text, routed to either the answer or the reasoning
/// channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedText {
    /// Ordinary answer text
    Text(String),
    /// Reasoning text found between the tag pair
    Thinking(String),
    /// The closing tag was found
    ThinkingEnd,
}

/// Splits streamed text on a literal tag pair, tolerating tags broken
/// across chunk boundaries
///
/// A fragment that might be the start of a tag is held back rather than
/// emitted or discarded; it is resolved once enough bytes arrive.
#[derive(Debug)]
pub struct TagScanner {
    open: String,
    close: String,
    inside: bool,
    buffer: String,
}

impl TagScanner {
    /// Create a scanner for the given tag pair
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            inside: false,
            buffer: String::new(),
        }
    }

    /// Feed a chunk of text and collect routed segments
    pub fn scan(&mut self, chunk: &str) -> Vec<TaggedText> {
        self.buffer.push_str(chunk);
        let mut out = Vec::new();

        loop {
            let needle = if self.inside { &self.close } else { &self.open };
            let Some(start) = potential_tag_start(&self.buffer, needle) else {
                if !self.buffer.is_empty() {
                    let text = std::mem::take(&mut self.buffer);
                    out.push(self.route(text));
                }
                break;
            };

            if start > 0 {
                let before = self.buffer[..start].to_owned();
                out.push(self.route(before));
            }

            if self.buffer.len() - start >= needle.len() {
                self.buffer = self.buffer[start + needle.len()..].to_owned();
                if self.inside {
                    out.push(TaggedText::ThinkingEnd);
                }
                self.inside = !self.inside;
            } else {
                // Partial tag: hold it until the next chunk resolves it
                self.buffer = self.buffer[start..].to_owned();
                break;
            }
        }

        out
    }

    /// Drain the scanner at end of stream
    ///
    /// A held fragment that never completed a tag is ordinary content for
    /// whichever channel was active.
    pub fn finish(&mut self) -> Vec<TaggedText> {
        let mut out = Vec::new();
        if !self.buffer.is_empty() {
            let text = std::mem::take(&mut self.buffer);
            out.push(self.route(text));
        }
        if self.inside {
            out.push(TaggedText::ThinkingEnd);
            self.inside = false;
        }
        out
    }

    fn route(&self, text: String) -> TaggedText {
        if self.inside {
            TaggedText::Thinking(text)
        } else {
            TaggedText::Text(text)
        }
    }
}

/// Index where `needle` occurs, or where a suffix of `text` could still
/// grow into it on the next chunk
fn potential_tag_start(text: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    if let Some(idx) = text.find(needle) {
        return Some(idx);
    }
    for (i, _) in text.char_indices().rev() {
        if needle.starts_with(&text[i..]) {
            return Some(i);
        }
    }
    None
}

/// Per-request reasoning state
///
/// Reasoning and answer content are mutually exclusive at any instant:
/// decoders close the reasoning channel before emitting answer text or a
/// tool call, and again at stream end so the caller always sees a
/// consistent terminal state.
#[derive(Debug)]
pub struct ThinkingTracker {
    active: bool,
    signature: Option<String>,
    scanner: Option<TagScanner>,
}

impl Default for ThinkingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingTracker {
    /// Tracker for providers with a structured reasoning field
    pub const fn new() -> Self {
        Self {
            active: false,
            signature: None,
            scanner: None,
        }
    }

    /// Tracker that additionally extracts inline `<think>` tags from
    /// ordinary text
    pub fn with_inline_tags() -> Self {
        Self {
            active: false,
            signature: None,
            scanner: Some(TagScanner::new(THINK_OPEN, THINK_CLOSE)),
        }
    }

    /// Record a structured reasoning delta
    pub fn thinking_delta(&mut self, text: &str) -> ChatEvent {
        self.active = true;
        ChatEvent::ThinkingDelta(text.to_owned())
    }

    /// Close the reasoning channel if it is open
    pub fn end(&mut self) -> Option<ChatEvent> {
        if self.active {
            self.active = false;
            Some(ChatEvent::ThinkingEnd {
                signature: self.signature.take(),
            })
        } else {
            None
        }
    }

    /// Whether the reasoning channel is currently open
    pub const fn active(&self) -> bool {
        self.active
    }

    /// Store the provider's continuation signature for this reasoning block
    pub fn set_signature(&mut self, signature: &str) {
        self.signature = Some(signature.to_owned());
    }

    /// Take the stored continuation signature, clearing it
    pub fn take_signature(&mut self) -> Option<String> {
        self.signature.take()
    }

    /// Route a chunk of ordinary text, extracting inline reasoning tags
    /// when configured
    pub fn route_text(&mut self, chunk: &str) -> Vec<ChatEvent> {
        let Some(scanner) = self.scanner.as_mut() else {
            let mut events = Vec::new();
            if let Some(end) = self.end() {
                events.push(end);
            }
            events.push(ChatEvent::TextDelta(chunk.to_owned()));
            return events;
        };

        let segments = scanner.scan(chunk);
        self.segments_to_events(segments)
    }

    /// Flush the tracker at end of stream
    pub fn finish(&mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        if let Some(scanner) = self.scanner.as_mut() {
            let segments = scanner.finish();
            events.extend(self.segments_to_events(segments));
        }
        if let Some(end) = self.end() {
            events.push(end);
        }
        events
    }

    fn segments_to_events(&mut self, segments: Vec<TaggedText>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        for segment in segments {
            match segment {
                TaggedText::Text(text) => {
                    if let Some(end) = self.end() {
                        events.push(end);
                    }
                    events.push(ChatEvent::TextDelta(text));
                }
                TaggedText::Thinking(text) => {
                    self.active = true;
                    events.push(ChatEvent::ThinkingDelta(text));
                }
                TaggedText::ThinkingEnd => {
                    if let Some(end) = self.end() {
                        events.push(end);
                    }
                }
            }
        }
        events
    }
}
