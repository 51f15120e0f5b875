//! Plain-text ingestion: file contents to word tokens to a [`Book`].

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use eyre::{Result, bail};
use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::models::{Book, BookId};

// A word split across lines with a trailing hyphen: "exam-\nple".
static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-[ \t]*\r?\n[ \t]*(\w)").expect("valid hyphen regex"));

// Lines holding nothing but a page number or a "Page 3 of 10" marker.
static PAGE_NUMBER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:page[ \t]+\d+(?:[ \t]+of[ \t]+\d+)?|\d+)[ \t]*$")
        .expect("valid page number regex")
});

/// Split text into display tokens. Punctuation stays attached to its word so
/// sentence ends can be detected during playback.
pub fn tokenize(text: &str) -> Vec<String> {
    let joined = HYPHEN_BREAK.replace_all(text, "$1$2");
    let cleaned = PAGE_NUMBER_LINE.replace_all(&joined, "");
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Stable id derived from the title and content, so re-importing the same
/// text finds the stored book.
pub fn book_id_for(title: &str, text: &str) -> BookId {
    let mut hasher = Sha1::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    BookId::new(&hex::encode(hasher.finalize())[..12])
}

pub fn book_from_text(title: &str, text: &str, file_type: &str) -> Book {
    let mut book = Book::new(book_id_for(title, text), title, tokenize(text));
    book.file_type = file_type.to_string();
    book.file_size = text.len();
    book
}

/// Read a text file into a book titled after the file name.
pub fn import_file(path: &Path) -> Result<Book> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    let file_type = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "txt".to_string());

    let mut book = book_from_text(&title, &text, &file_type);
    book.file_size = bytes.len();
    if book.words.is_empty() {
        bail!("{} contains no readable words", path.display());
    }
    debug!(id = %book.id, words = book.word_count, "imported {}", path.display());
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_punctuation() {
        assert_eq!(
            tokenize("The Quick  Fox\nRuns\tFar."),
            vec!["The", "Quick", "Fox", "Runs", "Far."]
        );
        assert_eq!(tokenize("\"Hello,\" she said."), vec!["\"Hello,\"", "she", "said."]);
        assert!(tokenize("   \n\t ").is_empty());
    }

    #[test]
    fn test_tokenize_joins_hyphenated_line_breaks() {
        assert_eq!(tokenize("an exam-\nple here"), vec!["an", "example", "here"]);
        // A real hyphen inside a line is left alone.
        assert_eq!(tokenize("well-known fact"), vec!["well-known", "fact"]);
    }

    #[test]
    fn test_tokenize_drops_page_number_lines() {
        let text = "first line\n12\nsecond line\nPage 3 of 10\nthird 42 words";
        assert_eq!(
            tokenize(text),
            vec!["first", "line", "second", "line", "third", "42", "words"]
        );
    }

    #[test]
    fn test_book_id_is_stable() {
        let a = book_id_for("Title", "some text");
        let b = book_id_for("Title", "some text");
        let c = book_id_for("Title", "other text");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 12);
        assert!(a.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_book_from_text() {
        let book = book_from_text("Fox", "The Quick Fox", "txt");
        assert_eq!(book.title, "Fox");
        assert_eq!(book.word_count, 3);
        assert_eq!(book.file_type, "txt");
        assert_eq!(book.progress, 0);
    }

    #[test]
    fn test_import_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Short Story.txt");
        fs::write(&path, "Once upon a time.")?;
        let book = import_file(&path)?;
        assert_eq!(book.title, "Short Story");
        assert_eq!(book.words, vec!["Once", "upon", "a", "time."]);
        assert_eq!(book.file_size, 17);

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "\n\n")?;
        assert!(import_file(&empty).is_err());
        Ok(())
    }
}
