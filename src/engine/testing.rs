use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use eyre::{Result, eyre};

use crate::models::{BookId, ProgressRecord};

use super::ports::ProgressStore;

/// In-memory progress store with switchable write failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: RefCell<HashMap<BookId, ProgressRecord>>,
    pub progress_writes: RefCell<Vec<usize>>,
    failing: Cell<bool>,
}

impl MemoryStore {
    pub fn with_book(id: &str) -> Self {
        let store = Self::default();
        store.insert(id, ProgressRecord::default());
        store
    }

    pub fn insert(&self, id: &str, record: ProgressRecord) {
        self.records.borrow_mut().insert(BookId::new(id), record);
    }

    pub fn remove(&self, id: &str) {
        self.records.borrow_mut().remove(&BookId::new(id));
    }

    pub fn record(&self, id: &str) -> ProgressRecord {
        self.records
            .borrow()
            .get(&BookId::new(id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    fn check(&self) -> Result<()> {
        if self.failing.get() {
            return Err(eyre!("store unavailable"));
        }
        Ok(())
    }

    fn update(&self, book_id: &BookId, f: impl FnOnce(&mut ProgressRecord)) -> Result<()> {
        self.check()?;
        let mut records = self.records.borrow_mut();
        let record = records
            .get_mut(book_id)
            .ok_or_else(|| eyre!("no such book: {book_id}"))?;
        f(record);
        Ok(())
    }
}

impl ProgressStore for MemoryStore {
    fn read_progress(&self, book_id: &BookId) -> Result<Option<ProgressRecord>> {
        self.check()?;
        Ok(self.records.borrow().get(book_id).cloned())
    }

    fn write_progress(&self, book_id: &BookId, progress: usize) -> Result<()> {
        self.update(book_id, |r| r.progress = progress)?;
        self.progress_writes.borrow_mut().push(progress);
        Ok(())
    }

    fn write_bookmark(&self, book_id: &BookId, position: usize) -> Result<()> {
        self.update(book_id, |r| r.bookmark = Some(position))
    }

    fn mark_last_read(&self, book_id: &BookId) -> Result<()> {
        self.check()?;
        let mut records = self.records.borrow_mut();
        for (id, record) in records.iter_mut() {
            record.last_read = if id == book_id {
                Some(chrono::Utc::now())
            } else {
                None
            };
        }
        Ok(())
    }

    fn mark_completed(&self, book_id: &BookId) -> Result<()> {
        self.update(book_id, |r| r.completed = true)
    }
}

pub fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
