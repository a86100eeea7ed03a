//! Grouping transcript words into on-screen caption units.

use capclip_models::Word;

/// Default number of words shown together.
pub const DEFAULT_CHUNK_SIZE: usize = 4;

/// Default character budget of one rendered line.
pub const DEFAULT_MAX_LINE_CHARS: usize = 24;

/// A contiguous run of transcript words displayed as one caption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionChunk<'a> {
    words: &'a [Word],
}

impl<'a> CaptionChunk<'a> {
    pub fn words(&self) -> &'a [Word] {
        self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Absolute start of the chunk in milliseconds.
    pub fn start_ms(&self) -> i64 {
        self.words.first().map(|w| w.start).unwrap_or(0)
    }

    /// Absolute end of the chunk in milliseconds, never before its start.
    pub fn end_ms(&self) -> i64 {
        self.words
            .last()
            .map(|w| w.end)
            .unwrap_or(0)
            .max(self.start_ms())
    }

    /// Words joined with single spaces.
    pub fn text(&self) -> String {
        join(self.words)
    }

    /// Index of the word that starts the second line, if the chunk wraps.
    ///
    /// A chunk wraps only when its joined text exceeds `max_chars` and it
    /// holds more than one word; the split is at `len / 2`.
    pub fn line_break(&self, max_chars: usize) -> Option<usize> {
        if self.words.len() > 1 && self.text().chars().count() > max_chars {
            Some(self.words.len() / 2)
        } else {
            None
        }
    }

    /// The one or two physical lines of the chunk.
    pub fn layout(&self, max_chars: usize) -> Vec<String> {
        match self.line_break(max_chars) {
            Some(mid) => vec![join(&self.words[..mid]), join(&self.words[mid..])],
            None => vec![self.text()],
        }
    }
}

/// Partition words into contiguous chunks of `size` (the last may be shorter).
///
/// A `size` of zero is treated as one.
pub fn chunk_words(words: &[Word], size: usize) -> Vec<CaptionChunk<'_>> {
    words
        .chunks(size.max(1))
        .map(|words| CaptionChunk { words })
        .collect()
}

fn join(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}
