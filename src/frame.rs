//! Frames and the single-slot frame buffer.
//!
//! - `Frame`: one captured RGB image, immutable once published.
//! - `FrameSlot`: shared storage holding only the most recent frame.
//!
//! Frames are published as `Arc<Frame>`. A writer swaps the pointer under the
//! slot mutex; a reader clones it. Pixel data is never mutated after
//! publication, so a reader can never observe a partially written frame.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Default capture width.
pub const FRAME_WIDTH: u32 = 640;
/// Default capture height.
pub const FRAME_HEIGHT: u32 = 480;

/// A captured frame in RGB8 layout.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Capture sequence number, assigned by the capture thread.
    pub seq: u64,
    image: RgbImage,
    captured_at: Instant,
}

impl Frame {
    pub fn new(seq: u64, image: RgbImage) -> Self {
        Self {
            seq,
            image,
            captured_at: Instant::now(),
        }
    }

    /// Wrap a packed RGB buffer. The length must be exactly `width * height * 3`.
    pub fn from_rgb(seq: u64, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let len = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow!(
                "RGB buffer of {} bytes does not fit {}x{}",
                len,
                width,
                height
            )
        })?;
        Ok(Self::new(seq, image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn age(&self) -> std::time::Duration {
        self.captured_at.elapsed()
    }
}

/// Last-write-wins single-slot buffer shared between the capture thread and
/// the render loop.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Arc<Frame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame. The previous frame is dropped once its last
    /// reader lets go of it.
    pub fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        let previous = {
            let mut guard = self
                .latest
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.replace(frame)
        };
        drop(previous);
    }

    /// Snapshot of the most recent frame, or `None` before the first capture.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(seq: u64, value: u8) -> Frame {
        Frame::from_rgb(seq, 4, 3, vec![value; 4 * 3 * 3]).unwrap()
    }

    #[test]
    fn from_rgb_rejects_wrong_length() {
        assert!(Frame::from_rgb(0, 4, 3, vec![0u8; 35]).is_err());
        assert!(Frame::from_rgb(0, 4, 3, vec![0u8; 36]).is_ok());
    }

    #[test]
    fn slot_is_empty_before_first_publish() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());
    }

    #[test]
    fn last_write_wins() {
        let slot = FrameSlot::new();
        slot.publish(solid(1, 10));
        slot.publish(solid(2, 20));

        let frame = slot.latest().unwrap();
        assert_eq!(frame.seq, 2);
        assert!(frame.pixels().iter().all(|&p| p == 20));
    }

    #[test]
    fn reader_snapshot_survives_overwrite() {
        let slot = FrameSlot::new();
        slot.publish(solid(1, 10));
        let held = slot.latest().unwrap();
        slot.publish(solid(2, 20));

        assert_eq!(held.seq, 1);
        assert!(held.pixels().iter().all(|&p| p == 10));
        assert_eq!(slot.latest().unwrap().seq, 2);
    }

    #[test]
    fn same_frame_may_be_read_twice() {
        let slot = FrameSlot::new();
        slot.publish(solid(7, 1));
        let a = slot.latest().unwrap();
        let b = slot.latest().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
