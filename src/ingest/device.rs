use anyhow::{anyhow, Result};

use super::normalize::PixelFormat;
use super::synthetic::SyntheticDevice;
use crate::frame::{FRAME_HEIGHT, FRAME_WIDTH};

/// Configuration for the capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// `stub://<name>`, a device index (`0` for `/dev/video0`) or a device path.
    pub device: String,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Requested capture rate. Synthetic devices pace themselves to it; 0 disables pacing.
    pub target_fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            target_fps: 30,
        }
    }
}

/// How a device string is interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSpec {
    Synthetic(String),
    Index(u32),
    Path(String),
}

impl DeviceSpec {
    pub fn parse(device: &str) -> Result<Self> {
        let device = device.trim();
        if device.is_empty() {
            return Err(anyhow!("capture device must not be empty"));
        }
        if let Some(name) = device.strip_prefix("stub://") {
            return Ok(DeviceSpec::Synthetic(name.to_string()));
        }
        if let Ok(index) = device.parse::<u32>() {
            return Ok(DeviceSpec::Index(index));
        }
        if device.contains("://") {
            return Err(anyhow!(
                "unsupported capture device '{}'; expected stub://, an index or a device path",
                device
            ));
        }
        Ok(DeviceSpec::Path(device.to_string()))
    }

    pub fn path(&self) -> Option<String> {
        match self {
            DeviceSpec::Synthetic(_) => None,
            DeviceSpec::Index(index) => Some(format!("/dev/video{}", index)),
            DeviceSpec::Path(path) => Some(path.clone()),
        }
    }
}

/// One image as delivered by a device, before normalization.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// A capture device, exclusively owned by the capture thread.
///
/// Dropping the device releases it.
pub trait CaptureDevice {
    /// Human-readable device name for logs and stats.
    fn describe(&self) -> String;

    /// Block until the next image is available.
    fn read(&mut self) -> Result<CapturedImage>;
}

/// Open the device named by `config.device`.
pub fn open_device(config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>> {
    match DeviceSpec::parse(&config.device)? {
        DeviceSpec::Synthetic(name) => Ok(Box::new(SyntheticDevice::new(name, config))),
        spec => open_hardware(spec, config),
    }
}

#[cfg(feature = "capture-v4l2")]
fn open_hardware(spec: DeviceSpec, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>> {
    let path = spec
        .path()
        .ok_or_else(|| anyhow!("device spec has no path"))?;
    Ok(Box::new(super::v4l2::V4l2Device::open(&path, config)?))
}

#[cfg(not(feature = "capture-v4l2"))]
fn open_hardware(spec: DeviceSpec, _config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>> {
    Err(anyhow!(
        "capture from {} requires the capture-v4l2 feature",
        spec.path().unwrap_or_default()
    ))
}
