//! Manual cursor movement on the active session.
//!
//! Every move clamps to the last word, persists the new cursor as progress
//! and emits a frame. Stepping and seeking leave playback paused.

use std::time::Instant;

use tracing::debug;

use crate::models::PlaybackState;

use super::controller::PlaybackController;
use super::error::{EngineError, EngineResult};
use super::ports::{PresentationSink, ProgressStore};
use super::scheduler::tick_interval;

impl<S: ProgressStore, P: PresentationSink> PlaybackController<S, P> {
    pub fn step_forward(&mut self) -> EngineResult<usize> {
        self.step_by(1)
    }

    pub fn step_backward(&mut self) -> EngineResult<usize> {
        self.step_by(-1)
    }

    /// Move the cursor by `delta` words.
    pub fn step_by(&mut self, delta: isize) -> EngineResult<usize> {
        let cursor = self.cursor();
        let target = if delta.is_negative() {
            cursor.saturating_sub(delta.unsigned_abs())
        } else {
            cursor.saturating_add(delta.unsigned_abs())
        };
        self.move_paused(target)
    }

    /// Jump to `percentage` of the book, `floor(percentage / 100 * len)`.
    pub fn seek(&mut self, percentage: u32) -> EngineResult<usize> {
        let len = self
            .session
            .as_ref()
            .ok_or(EngineError::NoBookLoaded)?
            .words
            .len();
        let target = percentage.min(100) as usize * len / 100;
        self.move_paused(target)
    }

    /// Move the cursor to the bookmark, keeping the playback state. Returns
    /// `None` when no bookmark is set.
    pub fn resume_from_bookmark(&mut self, now: Instant) -> EngineResult<Option<usize>> {
        let session = self.session.as_mut().ok_or(EngineError::NoBookLoaded)?;
        let Some(bookmark) = session.bookmark else {
            return Ok(None);
        };
        session.words.ensure_playable()?;
        session.cursor = bookmark.min(session.words.len() - 1);
        let cursor = session.cursor;
        if session.state == PlaybackState::Finished {
            self.set_state(PlaybackState::Paused);
        }
        if self.state() == PlaybackState::Playing {
            self.scheduler.arm(now, tick_interval(&self.prefs));
        }
        debug!(cursor, "resumed from bookmark");
        self.persist_progress();
        self.emit_current()?;
        Ok(Some(cursor))
    }

    fn move_paused(&mut self, target: usize) -> EngineResult<usize> {
        let session = self.session.as_mut().ok_or(EngineError::NoBookLoaded)?;
        session.words.ensure_playable()?;
        session.cursor = target.min(session.words.len() - 1);
        let cursor = session.cursor;

        self.scheduler.disarm();
        self.set_state(PlaybackState::Paused);
        debug!(cursor, "cursor moved");
        self.persist_progress();
        self.emit_current()?;
        Ok(cursor)
    }
}
