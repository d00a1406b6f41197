//! Frame ingestion.
//!
//! This module provides the capture side of the pipeline:
//! - `FrameSource`: dedicated capture thread publishing into a `FrameSlot`
//! - Synthetic device (`stub://` names) for tests and demos
//! - V4L2 devices (feature: capture-v4l2)
//!
//! The ingestion layer is responsible for:
//! - Opening the device at the configured resolution
//! - Normalizing device pixel layouts to RGB
//! - Releasing the device only after the capture loop has exited
//!
//! The ingestion layer MUST NOT:
//! - Queue frames (the slot holds only the latest one)
//! - Block the render loop

mod device;
mod normalize;
mod source;
mod synthetic;
#[cfg(feature = "capture-v4l2")]
mod v4l2;

pub use device::{open_device, CaptureConfig, CaptureDevice, CapturedImage, DeviceSpec};
pub use normalize::{normalize_to_rgb, PixelFormat};
pub use source::{CaptureStats, FrameSource};
pub use synthetic::SyntheticDevice;
#[cfg(feature = "capture-v4l2")]
pub use v4l2::V4l2Device;
