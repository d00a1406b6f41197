//! Fixed-cadence render loop.
//!
//! Every tick reads the newest frame from the slot (never waiting on the
//! capture thread), advances the tracker, composites the overlay, pushes the
//! image to the display sink and feeds the FPS meter.

use anyhow::Result;
use image::RgbImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::TrackerError;
use crate::fps::{format_fps_label, FpsMeter};
use crate::frame::{Frame, FrameSlot};
use crate::geometry::Roi;
use crate::overlay::{compose_tracked, OverlayStyle};
use crate::track::TrackerState;

/// Default tick period (about 30 Hz).
pub const TICK_PERIOD: Duration = Duration::from_millis(33);

/// Where rendered images and the FPS label go. Implemented by the host shell.
pub trait DisplaySink {
    /// Display one rendered frame.
    fn show(&mut self, image: &RgbImage) -> Result<()>;

    /// Replace the FPS label text.
    fn set_fps_label(&mut self, text: &str);
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing captured yet; nothing displayed.
    NoFrame,
    /// Idle: the raw frame was displayed.
    Raw,
    /// Tracking succeeded: the frame was displayed with this box drawn.
    Overlay(Roi),
    /// Tracking failed this frame: the raw frame was displayed.
    Lost,
}

/// Deadline-based timer. Late ticks are not made up for.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next tick is due.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            self.next = now + self.period;
        }
    }
}

pub struct RenderLoop {
    slot: Arc<FrameSlot>,
    tracker: TrackerState,
    fps: FpsMeter,
    style: OverlayStyle,
    period: Duration,
    last_fps: Option<f64>,
    ticks: u64,
}

impl RenderLoop {
    pub fn new(slot: Arc<FrameSlot>, tracker: TrackerState, period: Duration) -> Self {
        let mut fps = FpsMeter::new();
        fps.start();
        Self {
            slot,
            tracker,
            fps,
            style: OverlayStyle::default(),
            period,
            last_fps: None,
            ticks: 0,
        }
    }

    pub fn tracker(&self) -> &TrackerState {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut TrackerState {
        &mut self.tracker
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.slot.latest()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Most recently published frame rate.
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    /// Ticks that displayed a frame.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self, sink: &mut dyn DisplaySink) -> TickOutcome {
        let Some(frame) = self.slot.latest() else {
            return TickOutcome::NoFrame;
        };

        let outcome = if self.tracker.is_tracking() {
            match self.tracker.update(&frame) {
                Ok(roi) => {
                    let canvas = compose_tracked(&frame, roi, &self.style);
                    self.display(sink, &canvas, frame.seq);
                    TickOutcome::Overlay(roi)
                }
                Err(TrackerError::TrackingLost) => {
                    self.display(sink, frame.image(), frame.seq);
                    TickOutcome::Lost
                }
                Err(err) => {
                    log::error!("render: tracker update failed: {}", err);
                    self.display(sink, frame.image(), frame.seq);
                    TickOutcome::Raw
                }
            }
        } else {
            self.display(sink, frame.image(), frame.seq);
            TickOutcome::Raw
        };

        self.ticks += 1;
        self.fps.update();
        if self.fps.window_complete() {
            self.fps.stop();
            if let Some(fps) = self.fps.fps() {
                sink.set_fps_label(&format_fps_label(fps));
                log::debug!("render: {:.2} fps", fps);
                self.last_fps = Some(fps);
            }
            self.fps.start();
        }
        outcome
    }

    fn display(&self, sink: &mut dyn DisplaySink, image: &RgbImage, seq: u64) {
        if let Err(err) = sink.show(image) {
            log::warn!("render: display of frame {} failed: {:#}", seq, err);
        }
    }
}
