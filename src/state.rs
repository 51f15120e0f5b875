use std::path::Path;

use chrono::{DateTime, Days, NaiveDate, Utc};
use eyre::{Result, eyre};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::config::get_app_data_prefix;
use crate::engine::{ProgressStore, SessionStats, WordSequence, WordSource};
use crate::models::{Book, BookId, DailyStats, LibraryItem, ProgressRecord, ReadingSession};

const BOOK_COLUMNS: &str = "id, title, words, word_count, file_type, file_size, uploaded_at, \
                            progress, bookmark, last_read, completed";

const LIBRARY_COLUMNS: &str =
    "id, title, word_count, progress, bookmark, last_read, uploaded_at, completed";

/// Library, reading positions and statistics, kept in `states.db`.
pub struct State {
    conn: Connection,
}

impl State {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::open(prefix.join("states.db"))
    }

    pub fn open(filepath: impl AsRef<Path>) -> Result<Self> {
        let filepath = filepath.as_ref();
        if let Some(parent) = filepath.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(filepath)?;
        // Tables are only created when missing, so this is safe on an
        // existing database.
        Self::init_db(&conn)?;
        debug!(path = %filepath.display(), "state database opened");

        Ok(Self { conn })
    }

    fn init_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                words TEXT NOT NULL,
                word_count INTEGER NOT NULL,
                file_type TEXT NOT NULL DEFAULT 'txt',
                file_size INTEGER NOT NULL DEFAULT 0,
                uploaded_at DATETIME NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                bookmark INTEGER,
                last_read DATETIME,
                completed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS reading_sessions (
                date TEXT NOT NULL,
                book_id TEXT NOT NULL,
                title TEXT NOT NULL,
                words_read INTEGER NOT NULL DEFAULT 0,
                reading_secs REAL NOT NULL DEFAULT 0,
                wpm INTEGER NOT NULL DEFAULT 0,
                last_updated DATETIME NOT NULL,
                PRIMARY KEY (date, book_id)
            );
            ",
        )?;
        Ok(())
    }

    /// Store a new book. Returns `false` if a book with the same id exists.
    pub fn add_book(&self, book: &Book) -> Result<bool> {
        let words = serde_json::to_string(&book.words)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO books (id, title, words, word_count, file_type, file_size, uploaded_at, progress, bookmark, last_read, completed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                book.id.as_str(),
                book.title,
                words,
                book.words.len(),
                book.file_type,
                book.file_size,
                book.uploaded_at,
                book.progress,
                book.bookmark,
                book.last_read,
                book.completed,
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn get_book(&self, book_id: &BookId) -> Result<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id=?");
        let book = self
            .conn
            .query_row(&sql, params![book_id.as_str()], book_from_row)
            .optional()?;
        Ok(book)
    }

    /// Every stored book, most recently read first, then newest uploads.
    pub fn list_books(&self) -> Result<Vec<LibraryItem>> {
        let sql = format!(
            "SELECT {LIBRARY_COLUMNS} FROM books
             ORDER BY last_read IS NULL, last_read DESC, uploaded_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items_iter = stmt.query_map([], library_item_from_row)?;

        let mut items = Vec::new();
        for item in items_iter {
            items.push(item?);
        }
        Ok(items)
    }

    pub fn delete_book(&self, book_id: &BookId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM books WHERE id=?", params![book_id.as_str()])?;
        Ok(deleted > 0)
    }

    /// The book currently marked as being read, if any.
    pub fn get_last_read_book(&self) -> Result<Option<LibraryItem>> {
        let sql = format!(
            "SELECT {LIBRARY_COLUMNS} FROM books
             WHERE last_read IS NOT NULL ORDER BY last_read DESC LIMIT 1"
        );
        let item = self
            .conn
            .query_row(&sql, [], library_item_from_row)
            .optional()?;
        Ok(item)
    }

    /// Add a session's words and time to the per-day total of `book_id`. The
    /// stored WPM is the day's average over the summed words and time.
    pub fn record_session(
        &self,
        date: NaiveDate,
        book_id: &BookId,
        title: &str,
        stats: &SessionStats,
    ) -> Result<()> {
        if stats.is_empty() {
            return Ok(());
        }
        self.conn.execute(
            "INSERT INTO reading_sessions (date, book_id, title, words_read, reading_secs, wpm, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(date, book_id) DO UPDATE SET
                title = excluded.title,
                words_read = words_read + excluded.words_read,
                reading_secs = reading_secs + excluded.reading_secs,
                wpm = CASE
                    WHEN reading_secs + excluded.reading_secs > 0
                    THEN CAST(ROUND((words_read + excluded.words_read) * 60.0
                                    / (reading_secs + excluded.reading_secs)) AS INTEGER)
                    ELSE 0
                END,
                last_updated = excluded.last_updated",
            params![
                date,
                book_id.as_str(),
                title,
                stats.words_read,
                stats.reading_time.as_secs_f64(),
                stats.average_wpm(),
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    pub fn sessions_on(&self, date: NaiveDate) -> Result<Vec<ReadingSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, book_id, title, words_read, reading_secs, wpm, last_updated
             FROM reading_sessions WHERE date=? ORDER BY last_updated DESC",
        )?;
        let sessions_iter = stmt.query_map(params![date], |row| {
            Ok(ReadingSession {
                date: row.get(0)?,
                book_id: BookId::new(row.get::<_, String>(1)?),
                title: row.get(2)?,
                words_read: row.get(3)?,
                reading_secs: row.get(4)?,
                wpm: row.get(5)?,
                last_updated: row.get(6)?,
            })
        })?;

        let mut sessions = Vec::new();
        for session in sessions_iter {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    pub fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let (words_read, reading_secs, books_read) = self.conn.query_row(
            "SELECT COALESCE(SUM(words_read), 0), COALESCE(SUM(reading_secs), 0.0), COUNT(*)
             FROM reading_sessions WHERE date=?",
            params![date],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(DailyStats {
            date: Some(date),
            words_read,
            reading_secs,
            books_read,
        })
    }

    /// One entry per day for the `days` days ending at `today`, oldest first.
    pub fn recent_stats(&self, today: NaiveDate, days: u64) -> Result<Vec<DailyStats>> {
        let mut stats = Vec::new();
        for offset in (0..days).rev() {
            let date = today
                .checked_sub_days(Days::new(offset))
                .ok_or_else(|| eyre!("date out of range: {today} minus {offset} days"))?;
            stats.push(self.daily_stats(date)?);
        }
        Ok(stats)
    }

    fn update_book(&self, sql: &str, book_id: &BookId, value: Option<usize>) -> Result<()> {
        let updated = match value {
            Some(value) => self.conn.execute(sql, params![value, book_id.as_str()])?,
            None => self.conn.execute(sql, params![book_id.as_str()])?,
        };
        if updated == 0 {
            return Err(eyre!("no book with id {book_id}"));
        }
        Ok(())
    }
}

impl ProgressStore for State {
    fn read_progress(&self, book_id: &BookId) -> Result<Option<ProgressRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT progress, bookmark, last_read, completed FROM books WHERE id=?",
                params![book_id.as_str()],
                |row| {
                    Ok(ProgressRecord {
                        progress: row.get(0)?,
                        bookmark: row.get(1)?,
                        last_read: row.get(2)?,
                        completed: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn write_progress(&self, book_id: &BookId, progress: usize) -> Result<()> {
        self.update_book(
            "UPDATE books SET progress=? WHERE id=?",
            book_id,
            Some(progress),
        )
    }

    fn write_bookmark(&self, book_id: &BookId, position: usize) -> Result<()> {
        self.update_book(
            "UPDATE books SET bookmark=? WHERE id=?",
            book_id,
            Some(position),
        )
    }

    fn mark_last_read(&self, book_id: &BookId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE books SET last_read=NULL WHERE id<>?",
            params![book_id.as_str()],
        )?;
        let updated = tx.execute(
            "UPDATE books SET last_read=? WHERE id=?",
            params![Utc::now(), book_id.as_str()],
        )?;
        if updated == 0 {
            return Err(eyre!("no book with id {book_id}"));
        }
        tx.commit()?;
        Ok(())
    }

    fn mark_completed(&self, book_id: &BookId) -> Result<()> {
        self.update_book("UPDATE books SET completed=1 WHERE id=?", book_id, None)
    }
}

impl WordSource for State {
    fn word_sequence(&self, book_id: &BookId) -> Result<Option<WordSequence>> {
        Ok(self.get_book(book_id)?.map(|book| book.word_sequence()))
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let words_json: String = row.get(2)?;
    let words: Vec<String> = serde_json::from_str(&words_json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
    })?;
    let uploaded_at: DateTime<Utc> = row.get(6)?;
    Ok(Book {
        id: BookId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        words,
        word_count: row.get(3)?,
        file_type: row.get(4)?,
        file_size: row.get(5)?,
        uploaded_at,
        progress: row.get(7)?,
        bookmark: row.get(8)?,
        last_read: row.get(9)?,
        completed: row.get(10)?,
    })
}

fn library_item_from_row(row: &Row<'_>) -> rusqlite::Result<LibraryItem> {
    Ok(LibraryItem {
        id: BookId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        word_count: row.get(2)?,
        progress: row.get(3)?,
        bookmark: row.get(4)?,
        last_read: row.get(5)?,
        uploaded_at: row.get(6)?,
        completed: row.get(7)?,
    })
}
