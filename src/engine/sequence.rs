use std::ops::Range;
use std::sync::Arc;

use tracing::warn;

use super::error::{EngineError, EngineResult};

/// Read-only, indexed view over a book's tokens.
///
/// Cloning is cheap: the tokens are shared, never copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSequence {
    words: Arc<[String]>,
}

impl WordSequence {
    pub fn new(words: Vec<String>) -> Self {
        Self {
            words: words.into(),
        }
    }

    /// Build a sequence from stored data that also carries a cached word
    /// count. The token array is authoritative when the two disagree.
    pub fn from_stored(words: Vec<String>, stored_count: usize) -> Self {
        if stored_count != words.len() {
            warn!(
                stored_count,
                actual = words.len(),
                "stored word count disagrees with token array, using array length"
            );
        }
        Self::new(words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> EngineResult<&str> {
        self.words
            .get(index)
            .map(String::as_str)
            .ok_or(EngineError::OutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Tokens in `range`. The range must lie within `[0, len)` and be non-empty.
    pub fn slice(&self, range: Range<usize>) -> EngineResult<&[String]> {
        if range.start >= range.end || range.end > self.len() {
            return Err(EngineError::OutOfRange {
                index: range.end.max(range.start),
                len: self.len(),
            });
        }
        Ok(&self.words[range])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Ensure the sequence can be played.
    pub fn ensure_playable(&self) -> EngineResult<()> {
        if self.is_empty() {
            return Err(EngineError::EmptyContent);
        }
        Ok(())
    }
}

impl From<Vec<String>> for WordSequence {
    fn from(words: Vec<String>) -> Self {
        Self::new(words)
    }
}

impl From<&[&str]> for WordSequence {
    fn from(words: &[&str]) -> Self {
        Self::new(words.iter().map(|w| w.to_string()).collect())
    }
}
