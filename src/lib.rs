//! ROI tracker overlay
//!
//! This crate overlays an interactively selected bounding-box tracker on a
//! live camera feed.
//!
//! # Architecture
//!
//! Two execution contexts share one piece of state:
//!
//! 1. **Capture thread**: owns the camera, overwrites a single-slot frame
//!    buffer with every new frame until told to stop.
//! 2. **UI thread**: a fixed-cadence render loop reads the newest frame,
//!    advances the tracker, draws the box and its "WxH" label, hands the image
//!    to the display sink and measures the frame rate. Pointer and key events
//!    are applied on the same thread between ticks.
//!
//! The frame slot and the stop flag are the only synchronized state.
//!
//! # Module Structure
//!
//! - `ingest`: capture devices and the threaded `FrameSource`
//! - `frame`: `Frame` and the `FrameSlot` single-slot buffer
//! - `track`: the Idle/Tracking state machine and tracking backends
//! - `render`: the render loop and the `DisplaySink` host interface
//! - `input`: pointer/key handling
//! - `app`: composition root used by host shells

pub mod app;
pub mod config;
pub mod error;
pub mod fps;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod input;
pub mod overlay;
pub mod render;
pub mod track;

pub use app::OverlayApp;
pub use config::AppConfig;
pub use error::TrackerError;
pub use fps::{format_fps_label, FpsMeter, FPS_WINDOW};
pub use frame::{Frame, FrameSlot, FRAME_HEIGHT, FRAME_WIDTH};
pub use geometry::{Point, Rectangle, Roi, MIN_ROI_SIDE};
pub use ingest::{CaptureConfig, CaptureDevice, CaptureStats, FrameSource};
pub use input::{InputCommand, InputController, Key, KEY_CODE_ESCAPE, KEY_CODE_SPACE};
pub use overlay::{OverlayStyle, OVERLAY_COLOR};
pub use render::{DisplaySink, RenderLoop, TickOutcome, Ticker, TICK_PERIOD};
pub use track::{
    factory_by_name, ScriptedFactory, TemplateFactory, TemplateParams, TrackerBackend,
    TrackerFactory, TrackerPhase, TrackerSession, TrackerState,
};
