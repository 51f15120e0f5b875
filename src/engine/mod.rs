//! Reading playback engine: word sequencing, tick scheduling and the
//! play/pause/seek state machine. Rendering and storage live behind the
//! traits in [`ports`].

pub mod controller;
pub mod error;
pub mod navigation;
pub mod orp;
pub mod ports;
pub mod scheduler;
pub mod sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{PlaybackController, PlaybackSession, SessionStats, TickOutcome};
pub use error::{EngineError, EngineResult};
pub use orp::FramedWord;
pub use ports::{PreferenceStore, PresentationSink, ProgressStore, WordSource};
pub use scheduler::{PlaybackScheduler, tick_interval};
pub use sequence::WordSequence;
