use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

use crate::engine::orp::FramedWord;
use crate::engine::sequence::WordSequence;

/// Opaque, stable book identifier assigned at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub words: Vec<String>,
    pub word_count: usize,
    pub file_type: String,
    pub file_size: usize,
    pub uploaded_at: DateTime<Utc>,
    pub progress: usize,
    pub bookmark: Option<usize>,
    pub last_read: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl Book {
    pub fn new(id: BookId, title: impl Into<String>, words: Vec<String>) -> Self {
        let word_count = words.len();
        Self {
            id,
            title: title.into(),
            words,
            word_count,
            file_type: "txt".to_string(),
            file_size: 0,
            uploaded_at: Utc::now(),
            progress: 0,
            bookmark: None,
            last_read: None,
            completed: false,
        }
    }

    pub fn word_sequence(&self) -> WordSequence {
        WordSequence::from_stored(self.words.clone(), self.word_count)
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.progress, self.words.len())
    }
}

/// Library listing entry: a book without its token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryItem {
    pub id: BookId,
    pub title: String,
    pub word_count: usize,
    pub progress: usize,
    pub bookmark: Option<usize>,
    pub last_read: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
    pub completed: bool,
}

impl LibraryItem {
    pub fn percentage(&self) -> u8 {
        percentage(self.progress, self.word_count)
    }
}

/// Persisted reading position of one book.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressRecord {
    pub progress: usize,
    pub bookmark: Option<usize>,
    pub last_read: Option<DateTime<Utc>>,
    pub completed: bool,
}

/// Per-day, per-book reading aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSession {
    pub date: NaiveDate,
    pub book_id: BookId,
    pub title: String,
    pub words_read: usize,
    pub reading_secs: f64,
    pub wpm: u32,
    pub last_updated: DateTime<Utc>,
}

/// Totals for one calendar day across all books.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailyStats {
    pub date: Option<NaiveDate>,
    pub words_read: usize,
    pub reading_secs: f64,
    pub books_read: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Finished => "finished",
        }
    }
}

/// What the presentation layer receives on every tick and navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub words: Vec<FramedWord>,
    pub display_text: String,
    pub is_chunk: bool,
    pub cursor: usize,
    pub percentage: u8,
    pub state: PlaybackState,
}

impl DisplayFrame {
    pub fn new(words: Vec<FramedWord>, cursor: usize, len: usize, state: PlaybackState) -> Self {
        let display_text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            is_chunk: words.len() > 1,
            words,
            display_text,
            cursor,
            percentage: percentage(cursor, len),
            state,
        }
    }
}

/// Whole-number share of `len` covered by `cursor`, capped at 100.
pub fn percentage(cursor: usize, len: usize) -> u8 {
    if len == 0 {
        return 0;
    }
    (cursor.saturating_mul(100) / len).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(0, 10), 0);
        assert_eq!(percentage(5, 10), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(10, 10), 100);
        assert_eq!(percentage(20, 10), 100);
    }

    #[test]
    fn test_book_new_caches_word_count() {
        let book = Book::new(
            BookId::new("abc"),
            "Title",
            vec!["one".to_string(), "two".to_string()],
        );
        assert_eq!(book.word_count, 2);
        assert_eq!(book.progress, 0);
        assert_eq!(book.bookmark, None);
        assert!(!book.completed);
        assert_eq!(book.word_sequence().len(), 2);
    }

    #[test]
    fn test_book_sequence_ignores_stale_count() {
        let mut book = Book::new(BookId::new("abc"), "Title", vec!["one".to_string()]);
        book.word_count = 99;
        assert_eq!(book.word_sequence().len(), 1);
    }

    #[test]
    fn test_display_frame_chunk() {
        let words = vec![FramedWord::new("The"), FramedWord::new("Quick")];
        let frame = DisplayFrame::new(words, 2, 4, PlaybackState::Playing);
        assert!(frame.is_chunk);
        assert_eq!(frame.display_text, "The Quick");
        assert_eq!(frame.percentage, 50);

        let frame = DisplayFrame::new(vec![FramedWord::new("Fox")], 1, 4, PlaybackState::Paused);
        assert!(!frame.is_chunk);
        assert_eq!(frame.display_text, "Fox");
    }

    #[test]
    fn test_book_id_display() {
        let id = BookId::from("deadbeef");
        assert_eq!(id.to_string(), "deadbeef");
        assert_eq!(id.as_str(), "deadbeef");
    }
}
