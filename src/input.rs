//! Pointer and keyboard handling.
//!
//! A press starts a selection, the matching release finishes it and arms the
//! tracker on the current frame. ESCAPE asks the host to quit, SPACE cancels
//! tracking.

use crate::error::TrackerError;
use crate::frame::Frame;
use crate::geometry::{Point, Rectangle, Roi};
use crate::track::TrackerState;

/// Host key code for ESCAPE.
pub const KEY_CODE_ESCAPE: u32 = 0x0100_0000;
/// Host key code for SPACE.
pub const KEY_CODE_SPACE: u32 = 0x20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Other(u32),
}

impl Key {
    pub fn from_code(code: u32) -> Self {
        match code {
            KEY_CODE_ESCAPE => Key::Escape,
            KEY_CODE_SPACE => Key::Space,
            other => Key::Other(other),
        }
    }
}

/// What the host should do after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCommand {
    None,
    Quit,
}

#[derive(Debug, Default)]
pub struct InputController {
    pending: Option<Point>,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    /// First corner of a selection in progress, if any.
    pub fn pending(&self) -> Option<Point> {
        self.pending
    }

    pub fn press(&mut self, point: Point) {
        self.pending = Some(point);
    }

    /// Finish the selection and arm the tracker on `frame`.
    ///
    /// Returns the armed region, or `Ok(None)` when the selection had to be
    /// dropped (no press recorded, or no frame captured yet).
    pub fn release(
        &mut self,
        point: Point,
        tracker: &mut TrackerState,
        frame: Option<&Frame>,
    ) -> Result<Option<Roi>, TrackerError> {
        let Some(start) = self.pending.take() else {
            log::debug!("input: release at {:?} without a press", point);
            return Ok(None);
        };
        let Some(frame) = frame else {
            log::warn!("input: selection dropped, no frame captured yet");
            return Ok(None);
        };
        let rect = Rectangle::new(start, point);
        tracker.arm(frame, rect.xywh()).map(Some)
    }

    pub fn key(&mut self, key: Key, tracker: &mut TrackerState) -> InputCommand {
        match key {
            Key::Escape => InputCommand::Quit,
            Key::Space => {
                tracker.cancel();
                InputCommand::None
            }
            Key::Other(_) => InputCommand::None,
        }
    }
}
