//! Collaborator contracts the playback engine depends on.

use std::rc::Rc;

use eyre::Result;

use crate::models::{BookId, DisplayFrame, PlaybackState, ProgressRecord};
use crate::settings::{Preferences, PreferencesPatch};

use super::sequence::WordSequence;

/// Key-value persistence for reading positions.
///
/// Writes are synchronous. A failed write is reported through the returned
/// error; the engine keeps playing and retries on its next write.
pub trait ProgressStore {
    /// `Ok(None)` means the book no longer exists in the store.
    fn read_progress(&self, book_id: &BookId) -> Result<Option<ProgressRecord>>;
    fn write_progress(&self, book_id: &BookId, progress: usize) -> Result<()>;
    fn write_bookmark(&self, book_id: &BookId, position: usize) -> Result<()>;
    /// Stamp `book_id` as currently being read and clear the stamp on every
    /// other book.
    fn mark_last_read(&self, book_id: &BookId) -> Result<()>;
    fn mark_completed(&self, book_id: &BookId) -> Result<()>;
}

impl<T: ProgressStore + ?Sized> ProgressStore for Rc<T> {
    fn read_progress(&self, book_id: &BookId) -> Result<Option<ProgressRecord>> {
        (**self).read_progress(book_id)
    }

    fn write_progress(&self, book_id: &BookId, progress: usize) -> Result<()> {
        (**self).write_progress(book_id, progress)
    }

    fn write_bookmark(&self, book_id: &BookId, position: usize) -> Result<()> {
        (**self).write_bookmark(book_id, position)
    }

    fn mark_last_read(&self, book_id: &BookId) -> Result<()> {
        (**self).mark_last_read(book_id)
    }

    fn mark_completed(&self, book_id: &BookId) -> Result<()> {
        (**self).mark_completed(book_id)
    }
}

pub trait PreferenceStore {
    fn read_preferences(&self) -> Result<Preferences>;
    fn write_preferences(&mut self, patch: &PreferencesPatch) -> Result<()>;
}

/// Supplies the tokenized content of a stored book.
pub trait WordSource {
    /// `Ok(None)` when no such book exists.
    fn word_sequence(&self, book_id: &BookId) -> Result<Option<WordSequence>>;
}

/// Receives every frame the engine decides to show. Rendering is entirely
/// the sink's business.
pub trait PresentationSink {
    fn present(&mut self, frame: DisplayFrame);

    fn state_changed(&mut self, _state: PlaybackState) {}
}

/// Recording sink, handy for tests and non-interactive drivers.
impl PresentationSink for Vec<DisplayFrame> {
    fn present(&mut self, frame: DisplayFrame) {
        self.push(frame);
    }
}
