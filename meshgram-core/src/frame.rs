//! Fitting outbound text into the radio payload budget

/// Appended whenever text had to be cut. Counts toward the budget.
pub const ELLIPSIS: &str = "..";

/// Truncates text so its UTF-8 encoding fits a fixed number of bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_bytes: usize,
}

impl FrameCodec {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn truncate(&self, text: &str) -> String {
        truncate(text, self.max_bytes)
    }

    /// Truncate and hand back the bytes that go on the air
    pub fn encode(&self, text: &str) -> Vec<u8> {
        self.truncate(text).into_bytes()
    }
}

/// Collapse every whitespace run to a single space and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize whitespace, then cut to at most `max_bytes` bytes.
///
/// The cut never splits a code point. When the last space of the kept text
/// sits past half of it, the partial trailing word is dropped as well.
/// A cut result always ends with [`ELLIPSIS`].
pub fn truncate(text: &str, max_bytes: usize) -> String {
    let text = normalize_whitespace(text);
    if text.len() <= max_bytes {
        return text;
    }

    let mut cut = max_bytes.saturating_sub(ELLIPSIS.len()).min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut kept = &text[..cut];

    if let Some(space) = kept.rfind(' ') {
        let space_chars = kept[..space].chars().count();
        let total_chars = kept.chars().count();
        if space_chars * 2 > total_chars {
            kept = &kept[..space];
        }
    }

    format!("{kept}{ELLIPSIS}")
}
