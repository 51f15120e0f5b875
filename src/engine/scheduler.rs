//! Deadline-based tick timer for a reading session.
//!
//! The scheduler never reads the clock. Callers pass `now` into every call
//! and poll for due ticks, so a session is driven identically by a terminal
//! event loop and by tests that fabricate instants.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::settings::{DisplayMode, Preferences, clamp_chunk_size, clamp_wpm};

const VARIABILITY_PER_EXTRA_WORD: f64 = 0.2;

/// Inter-tick delay for the given preferences: `60000 / wpm` milliseconds,
/// stretched for larger chunks when speed variability is on.
pub fn tick_interval(prefs: &Preferences) -> Duration {
    let base_ms = 60_000.0 / clamp_wpm(prefs.wpm) as f64;
    let factor = if prefs.speed_variability && prefs.mode == DisplayMode::Chunked {
        1.0 + (clamp_chunk_size(prefs.chunk_size) - 1) as f64 * VARIABILITY_PER_EXTRA_WORD
    } else {
        1.0
    };
    Duration::from_micros((base_ms * factor * 1_000.0).round() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Disarmed,
    Repeating {
        interval: Duration,
        next_at: Instant,
    },
    /// One-shot sentence pause; the repeating timer resumes at `resume_at`
    /// and its first tick lands one `interval` later.
    SentencePause {
        interval: Duration,
        resume_at: Instant,
    },
}

/// The only owner of a session's tick timer. At most one timer exists at a
/// time; arming always replaces whatever was armed before.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    timer: Timer,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            timer: Timer::Disarmed,
        }
    }

    /// Start a repeating tick every `interval`, the first one `interval` after
    /// `now`. Any previously armed timer or pending sentence pause is dropped.
    pub fn arm(&mut self, now: Instant, interval: Duration) {
        debug!(interval_ms = interval.as_millis() as u64, "arming tick timer");
        self.timer = Timer::Repeating {
            interval,
            next_at: now + interval,
        };
    }

    /// Apply a new interval. A repeating timer restarts its period from `now`;
    /// a pending sentence pause keeps its resume time and only the interval
    /// used after it changes. A disarmed scheduler stays disarmed.
    pub fn rearm(&mut self, now: Instant, interval: Duration) {
        match self.timer {
            Timer::Disarmed => {}
            Timer::Repeating { .. } => self.arm(now, interval),
            Timer::SentencePause { resume_at, .. } => {
                self.timer = Timer::SentencePause {
                    interval,
                    resume_at,
                };
            }
        }
    }

    pub fn disarm(&mut self) {
        if self.timer != Timer::Disarmed {
            debug!("disarming tick timer");
        }
        self.timer = Timer::Disarmed;
    }

    /// Suspend the repeating timer for `duration`. The next tick fires one
    /// interval after the pause ends. No-op when disarmed.
    pub fn schedule_sentence_pause(&mut self, now: Instant, duration: Duration) {
        let interval = match self.timer {
            Timer::Disarmed => return,
            Timer::Repeating { interval, .. } | Timer::SentencePause { interval, .. } => interval,
        };
        debug!(pause_ms = duration.as_millis() as u64, "sentence pause");
        self.timer = Timer::SentencePause {
            interval,
            resume_at: now + duration,
        };
    }

    pub fn is_armed(&self) -> bool {
        self.timer != Timer::Disarmed
    }

    pub fn in_sentence_pause(&self) -> bool {
        matches!(self.timer, Timer::SentencePause { .. })
    }

    pub fn interval(&self) -> Option<Duration> {
        match self.timer {
            Timer::Disarmed => None,
            Timer::Repeating { interval, .. } | Timer::SentencePause { interval, .. } => {
                Some(interval)
            }
        }
    }

    /// When the next tick is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.timer {
            Timer::Disarmed => None,
            Timer::Repeating { next_at, .. } => Some(next_at),
            Timer::SentencePause {
                interval,
                resume_at,
            } => Some(resume_at + interval),
        }
    }

    /// Report whether a tick is due at `now`. At most one tick is reported per
    /// call and the following one is scheduled a full interval after `now`,
    /// so a late caller never receives a burst of ticks.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.next_deadline() else {
            return false;
        };
        if now < deadline {
            return false;
        }
        let Some(interval) = self.interval() else {
            return false;
        };
        self.timer = Timer::Repeating {
            interval,
            next_at: now + interval,
        };
        true
    }
}
