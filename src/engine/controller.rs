//! Playback state machine for one reading session at a time.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::models::{BookId, DisplayFrame, PlaybackState, ProgressRecord, percentage};
use crate::settings::{DisplayMode, Preferences, clamp_wpm};

use super::error::{EngineError, EngineResult};
use super::orp::{ends_sentence, frame_words};
use super::ports::{PresentationSink, ProgressStore, WordSource};
use super::scheduler::{PlaybackScheduler, tick_interval};
use super::sequence::WordSequence;

/// Ephemeral state of the book currently bound to the controller. Only the
/// cursor, bookmark and completion flag ever reach the progress store, and
/// only for this session's own book.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub(super) book_id: BookId,
    pub(super) words: WordSequence,
    pub(super) state: PlaybackState,
    pub(super) cursor: usize,
    pub(super) bookmark: Option<usize>,
    pub(super) completed: bool,
    pending: PendingWrites,
}

impl PlaybackSession {
    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn words(&self) -> &WordSequence {
        &self.words
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn bookmark(&self) -> Option<usize> {
        self.bookmark
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Words advanced and time spent playing since the stats were last taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub words_read: usize,
    pub reading_time: Duration,
}

impl SessionStats {
    pub fn is_empty(&self) -> bool {
        self.words_read == 0
    }

    pub fn average_wpm(&self) -> u32 {
        let secs = self.reading_time.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.words_read as f64 * 60.0 / secs).round() as u32
    }
}

/// Result of pumping the controller once.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No tick was due.
    Idle,
    Advanced(DisplayFrame),
    Finished(DisplayFrame),
    /// The tick failed; playback has been paused.
    Faulted(EngineError),
}

/// Writes that failed and are retried on the next persist of the session
/// they belong to.
#[derive(Debug, Clone, Default)]
struct PendingWrites {
    progress: bool,
    bookmark: Option<usize>,
    completed: bool,
}

impl PendingWrites {
    fn any(&self) -> bool {
        self.progress || self.bookmark.is_some() || self.completed
    }
}

pub struct PlaybackController<S, P> {
    pub(super) store: S,
    pub(super) sink: P,
    pub(super) prefs: Preferences,
    pub(super) scheduler: PlaybackScheduler,
    pub(super) session: Option<PlaybackSession>,
    stats: SessionStats,
}

impl<S: ProgressStore, P: PresentationSink> PlaybackController<S, P> {
    pub fn new(store: S, sink: P) -> Self {
        Self::with_preferences(store, sink, Preferences::default())
    }

    pub fn with_preferences(store: S, sink: P, prefs: Preferences) -> Self {
        Self {
            store,
            sink,
            prefs: prefs.normalized(),
            scheduler: PlaybackScheduler::new(),
            session: None,
            stats: SessionStats::default(),
        }
    }

    /// Bind `words` as the active session, replacing any previous one.
    ///
    /// The cursor starts at the stored progress, falling back to the
    /// bookmark. A book unknown to the store cannot be opened.
    pub fn open(&mut self, book_id: BookId, words: WordSequence) -> EngineResult<()> {
        self.close();

        let record = match self.store.read_progress(&book_id) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(EngineError::NoBookLoaded),
            Err(err) => {
                warn!(%book_id, "could not read progress, starting at the beginning: {err:#}");
                ProgressRecord::default()
            }
        };

        let len = words.len();
        if len == 0 {
            warn!(%book_id, "opened a book with no words");
        }
        let start = if record.progress > 0 {
            record.progress
        } else {
            record.bookmark.unwrap_or(0)
        };
        let cursor = start.min(len);
        info!(%book_id, cursor, len, "session opened");

        self.session = Some(PlaybackSession {
            book_id,
            words,
            state: PlaybackState::Idle,
            cursor,
            bookmark: record.bookmark,
            completed: record.completed,
            pending: PendingWrites::default(),
        });
        self.emit_current()
    }

    /// Fetch the words of `book_id` from `source` and bind them.
    pub fn open_from(&mut self, source: &dyn WordSource, book_id: BookId) -> EngineResult<()> {
        let words = match source.word_sequence(&book_id) {
            Ok(Some(words)) => words,
            Ok(None) => return Err(EngineError::NoBookLoaded),
            Err(err) => {
                error!(%book_id, "failed to load words: {err:#}");
                return Err(EngineError::NoBookLoaded);
            }
        };
        self.open(book_id, words)
    }

    /// Tear down the session. The timer is disarmed before this returns.
    pub fn close(&mut self) -> Option<PlaybackSession> {
        self.scheduler.disarm();
        if self.session.is_none() {
            return None;
        }
        self.persist_progress();
        let mut session = self.session.take()?;
        if session.pending.any() {
            warn!(
                book_id = %session.book_id,
                pending = ?session.pending,
                "discarding writes that could not be persisted"
            );
            session.pending = PendingWrites::default();
        }
        info!(book_id = %session.book_id, cursor = session.cursor, "session closed");
        session.state = PlaybackState::Idle;
        Some(session)
    }

    pub fn play(&mut self, now: Instant) -> EngineResult<()> {
        let session = self.session.as_ref().ok_or(EngineError::NoBookLoaded)?;
        session.words.ensure_playable()?;
        if session.state == PlaybackState::Playing {
            return Ok(());
        }

        let book_id = session.book_id.clone();
        match self.store.read_progress(&book_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(%book_id, "book no longer exists, discarding session");
                self.scheduler.disarm();
                self.session = None;
                return Err(EngineError::NoBookLoaded);
            }
            Err(err) => warn!(%book_id, "could not verify book before playing: {err:#}"),
        }

        let session = self.session.as_mut().ok_or(EngineError::NoBookLoaded)?;
        let last = session.words.len() - 1;
        let restarted = session.state == PlaybackState::Finished || session.cursor >= last;
        if restarted {
            debug!(%book_id, "replaying from the first word");
            session.cursor = 0;
        }

        if let Err(err) = self.store.mark_last_read(&book_id) {
            warn!(%book_id, "failed to mark book as last read: {err:#}");
        }
        if restarted {
            self.persist_progress();
        }
        self.set_state(PlaybackState::Playing);
        self.scheduler.arm(now, tick_interval(&self.prefs));
        self.emit_current()
    }

    pub fn pause(&mut self) -> EngineResult<()> {
        let session = self.session.as_ref().ok_or(EngineError::NoBookLoaded)?;
        if session.state != PlaybackState::Playing {
            return Ok(());
        }
        self.scheduler.disarm();
        self.set_state(PlaybackState::Paused);
        self.persist_progress();
        self.emit_current()
    }

    /// Play when not playing, pause otherwise. Returns the new state.
    pub fn toggle(&mut self, now: Instant) -> EngineResult<PlaybackState> {
        if self.state() == PlaybackState::Playing {
            self.pause()?;
        } else {
            self.play(now)?;
        }
        Ok(self.state())
    }

    /// Stop and rewind to the first word. Never resumes playback.
    pub fn restart(&mut self) -> EngineResult<()> {
        self.scheduler.disarm();
        let session = self.session.as_mut().ok_or(EngineError::NoBookLoaded)?;
        session.cursor = 0;
        self.set_state(PlaybackState::Paused);
        self.persist_progress();
        self.emit_current()
    }

    /// Record the cursor as the bookmark. Progress and state are untouched.
    pub fn set_bookmark(&mut self) -> EngineResult<usize> {
        let session = self.session.as_mut().ok_or(EngineError::NoBookLoaded)?;
        let position = session.cursor;
        session.bookmark = Some(position);
        session.pending.bookmark = Some(position);
        self.flush_bookmark();
        Ok(position)
    }

    /// Run the tick due at `now`, if any.
    pub fn pump(&mut self, now: Instant) -> TickOutcome {
        if self.state() != PlaybackState::Playing || !self.scheduler.poll(now) {
            return TickOutcome::Idle;
        }
        match self.tick(now) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("tick failed, pausing playback: {err}");
                self.scheduler.disarm();
                self.set_state(PlaybackState::Paused);
                self.persist_progress();
                TickOutcome::Faulted(err)
            }
        }
    }

    fn tick(&mut self, now: Instant) -> EngineResult<TickOutcome> {
        let step = self.prefs.step();
        let interval = self
            .scheduler
            .interval()
            .unwrap_or_else(|| tick_interval(&self.prefs));
        let session = self.session.as_mut().ok_or(EngineError::NoBookLoaded)?;
        let len = session.words.len();
        let previous = session.cursor;
        session.cursor = previous.saturating_add(step).min(len);
        let cursor = session.cursor;

        self.stats.words_read += cursor.saturating_sub(previous);
        self.stats.reading_time += interval;
        debug!(cursor, len, "tick");

        self.persist_progress();
        if cursor + 1 >= len {
            self.mark_completed();
        }

        if cursor >= len {
            self.scheduler.disarm();
            self.set_state(PlaybackState::Finished);
            let frame = self.current_frame()?;
            self.sink.present(frame.clone());
            return Ok(TickOutcome::Finished(frame));
        }

        let frame = self.current_frame()?;
        if self.prefs.pause_at_sentence_end
            && frame.words.last().is_some_and(|word| ends_sentence(&word.text))
        {
            self.scheduler
                .schedule_sentence_pause(now, Duration::from_millis(self.prefs.sentence_pause_ms));
        }
        self.sink.present(frame.clone());
        Ok(TickOutcome::Advanced(frame))
    }

    /// Replace the preferences. While playing, the timer is re-armed so the
    /// next tick lands one new interval from `now`.
    pub fn set_preferences(&mut self, now: Instant, prefs: Preferences) {
        let previous_step = self.prefs.step();
        self.prefs = prefs.normalized();
        if self.state() == PlaybackState::Playing {
            self.scheduler.rearm(now, tick_interval(&self.prefs));
        }
        if self.prefs.step() != previous_step {
            if let Err(err) = self.emit_current() {
                error!("failed to redraw after preference change: {err}");
            }
        }
    }

    pub fn set_wpm(&mut self, now: Instant, wpm: u32) -> u32 {
        let prefs = Preferences {
            wpm: clamp_wpm(wpm),
            ..self.prefs
        };
        self.set_preferences(now, prefs);
        self.prefs.wpm
    }

    /// Step the speed up or down by the configured increment.
    pub fn adjust_wpm(&mut self, now: Instant, faster: bool) -> u32 {
        let wpm = if faster {
            self.prefs.wpm.saturating_add(self.prefs.wpm_step)
        } else {
            self.prefs.wpm.saturating_sub(self.prefs.wpm_step)
        };
        self.set_wpm(now, wpm)
    }

    pub fn set_mode(&mut self, now: Instant, mode: DisplayMode, chunk_size: usize) {
        let prefs = Preferences {
            mode,
            chunk_size,
            ..self.prefs
        };
        self.set_preferences(now, prefs);
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map_or(PlaybackState::Idle, |session| session.state)
    }

    pub fn cursor(&self) -> usize {
        self.session.as_ref().map_or(0, |session| session.cursor)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Interval between ticks under the current preferences.
    pub fn interval(&self) -> Duration {
        tick_interval(&self.prefs)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn in_sentence_pause(&self) -> bool {
        self.scheduler.in_sentence_pause()
    }

    pub fn percentage(&self) -> u8 {
        self.session
            .as_ref()
            .map_or(0, |session| percentage(session.cursor, session.words.len()))
    }

    pub fn has_pending_writes(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pending.any())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn take_session_stats(&mut self) -> SessionStats {
        std::mem::take(&mut self.stats)
    }

    pub(super) fn set_state(&mut self, state: PlaybackState) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state == state {
            return;
        }
        info!(
            book_id = %session.book_id,
            from = session.state.label(),
            to = state.label(),
            "playback state changed"
        );
        session.state = state;
        self.sink.state_changed(state);
    }

    pub(super) fn current_frame(&self) -> EngineResult<DisplayFrame> {
        let session = self.session.as_ref().ok_or(EngineError::NoBookLoaded)?;
        let len = session.words.len();
        if session.cursor >= len {
            return Ok(DisplayFrame::new(
                Vec::new(),
                session.cursor,
                len,
                session.state,
            ));
        }
        let end = (session.cursor + self.prefs.step()).min(len);
        let words = session.words.slice(session.cursor..end)?;
        Ok(DisplayFrame::new(
            frame_words(words),
            session.cursor,
            len,
            session.state,
        ))
    }

    pub(super) fn emit_current(&mut self) -> EngineResult<()> {
        let frame = self.current_frame()?;
        self.sink.present(frame);
        Ok(())
    }

    /// Write the cursor as progress and retry anything that failed earlier.
    /// Failures are logged and kept for the next attempt.
    pub(super) fn persist_progress(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.store.write_progress(&session.book_id, session.cursor) {
            Ok(()) => {
                if session.pending.progress {
                    info!(book_id = %session.book_id, "progress write recovered");
                }
                session.pending.progress = false;
            }
            Err(err) => {
                warn!(
                    book_id = %session.book_id,
                    cursor = session.cursor,
                    "failed to persist progress: {err:#}"
                );
                session.pending.progress = true;
            }
        }
        self.flush_bookmark();
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.pending.completed)
        {
            self.write_completed();
        }
    }

    fn flush_bookmark(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(position) = session.pending.bookmark else {
            return;
        };
        match self.store.write_bookmark(&session.book_id, position) {
            Ok(()) => session.pending.bookmark = None,
            Err(err) => {
                warn!(book_id = %session.book_id, position, "failed to persist bookmark: {err:#}");
            }
        }
    }

    fn mark_completed(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.completed {
            return;
        }
        session.completed = true;
        info!(book_id = %session.book_id, "book completed");
        self.write_completed();
    }

    fn write_completed(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.store.mark_completed(&session.book_id) {
            Ok(()) => session.pending.completed = false,
            Err(err) => {
                warn!(book_id = %session.book_id, "failed to mark book completed: {err:#}");
                session.pending.completed = true;
            }
        }
    }
}
