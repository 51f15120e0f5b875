use crate::engine::PresentationSink;
use crate::models::{DisplayFrame, PlaybackState};

/// Keeps the most recent frame for the next redraw.
#[derive(Debug, Default)]
pub struct FrameSlot {
    frame: Option<DisplayFrame>,
    dirty: bool,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> Option<&DisplayFrame> {
        self.frame.as_ref()
    }

    /// Whether anything arrived since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl PresentationSink for FrameSlot {
    fn present(&mut self, frame: DisplayFrame) {
        self.frame = Some(frame);
        self.dirty = true;
    }

    fn state_changed(&mut self, _state: PlaybackState) {
        self.dirty = true;
    }
}
