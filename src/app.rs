//! Composition root.
//!
//! `OverlayApp` wires the capture thread, the render loop and the input
//! controller together and exposes the entry points a host shell calls:
//! pointer press/release, key press, window close, and timer ticks. All of
//! them run on the host's UI thread.

use anyhow::Result;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::TrackerError;
use crate::geometry::{Point, Roi};
use crate::ingest::{CaptureStats, FrameSource};
use crate::input::{InputCommand, InputController, Key};
use crate::render::{DisplaySink, RenderLoop, TickOutcome, Ticker};
use crate::track::{TrackerFactory, TrackerState};

pub struct OverlayApp {
    source: FrameSource,
    render: RenderLoop,
    input: InputController,
    quit_requested: bool,
}

impl OverlayApp {
    /// Open the capture device and assemble the pipeline. Fails only when the
    /// device is unavailable.
    pub fn start(
        config: &AppConfig,
        factory: Box<dyn TrackerFactory>,
    ) -> Result<Self, TrackerError> {
        let source = FrameSource::start(config.capture.clone())?;
        Ok(Self::with_source(source, factory, config.tick))
    }

    /// Assemble the pipeline around an already running source.
    pub fn with_source(
        source: FrameSource,
        factory: Box<dyn TrackerFactory>,
        tick: Duration,
    ) -> Self {
        let tracker = TrackerState::new(factory);
        let render = RenderLoop::new(source.slot(), tracker, tick);
        Self {
            source,
            render,
            input: InputController::new(),
            quit_requested: false,
        }
    }

    pub fn source(&self) -> &FrameSource {
        &self.source
    }

    pub fn render(&self) -> &RenderLoop {
        &self.render
    }

    pub fn tracker(&self) -> &TrackerState {
        self.render.tracker()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn on_press(&mut self, point: Point) {
        self.input.press(point);
    }

    /// Finish a selection on the newest frame and arm the tracker.
    pub fn on_release(&mut self, point: Point) -> Result<Option<Roi>, TrackerError> {
        let frame = self.render.latest_frame();
        self.input
            .release(point, self.render.tracker_mut(), frame.as_deref())
    }

    pub fn on_key(&mut self, code: u32) -> InputCommand {
        let command = self
            .input
            .key(Key::from_code(code), self.render.tracker_mut());
        if command == InputCommand::Quit {
            log::info!("app: quit requested");
            self.quit_requested = true;
        }
        command
    }

    pub fn on_close(&mut self) {
        self.quit_requested = true;
    }

    pub fn tick(&mut self, sink: &mut dyn DisplaySink) -> TickOutcome {
        self.render.tick(sink)
    }

    /// Tick on the render period until quit is requested or `host` breaks.
    /// `host` runs before every tick to deliver pending UI events.
    pub fn run<F>(&mut self, sink: &mut dyn DisplaySink, mut host: F)
    where
        F: FnMut(&mut OverlayApp) -> ControlFlow<()>,
    {
        let mut ticker = Ticker::new(self.render.period());
        let mut last_health_log = std::time::Instant::now();
        loop {
            if host(self).is_break() || self.quit_requested {
                break;
            }
            self.render.tick(sink);
            if last_health_log.elapsed() >= Duration::from_secs(5) {
                let stats = self.source.stats();
                log::info!(
                    "capture health={} frames={} failures={} device={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.read_failures,
                    stats.device
                );
                last_health_log = std::time::Instant::now();
            }
            ticker.wait();
        }
    }

    /// Stop capture and wait for the capture thread to release the device.
    pub fn shutdown(self) -> Result<CaptureStats> {
        let OverlayApp { source, render, .. } = self;
        drop(render);
        source.stop();
        let stats = source.join()?;
        log::info!(
            "app: shut down after {} frames from {}",
            stats.frames_captured,
            stats.device
        );
        Ok(stats)
    }
}
