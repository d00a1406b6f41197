//! V4L2 capture device.
//!
//! Opens a local device node, negotiates the requested resolution and hands
//! frames to the capture thread in whatever layout the driver settled on.
//! The stream borrows the device, so both live in one self-referencing struct.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::device::{CaptureConfig, CaptureDevice, CapturedImage};
use super::normalize::PixelFormat;

const STREAM_BUFFERS: u32 = 4;

pub struct V4l2Device {
    path: String,
    state: V4l2State,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Device {
    pub fn open(path: &str, config: &CaptureConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device =
            v4l::Device::with_path(path).with_context(|| format!("open v4l2 device {}", path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("V4l2Device: failed to set format on {}: {}", path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        let pixel_format = pixel_format_for(&format.fourcc.repr)?;

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2Device: failed to set fps on {}: {}", path, err);
            }
        }

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Device: opened {} ({}x{} {:?}, stride {})",
            path,
            format.width,
            format.height,
            pixel_format,
            format.stride
        );
        Ok(Self {
            path: path.to_string(),
            state,
            width: format.width,
            height: format.height,
            stride: format.stride,
            format: pixel_format,
        })
    }
}

impl CaptureDevice for V4l2Device {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn read(&mut self) -> Result<CapturedImage> {
        use v4l::io::traits::CaptureStream;

        let (buf, meta) = self
            .state
            .with_mut(|fields| fields.stream.next())
            .context("capture v4l2 frame")?;
        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let pixels = strip_row_padding(
            &buf[..used],
            self.stride as usize,
            row_bytes(self.format, self.width),
            row_count(self.format, self.height),
        )?;
        Ok(CapturedImage {
            pixels,
            width: self.width,
            height: self.height,
            format: self.format,
        })
    }
}

impl Drop for V4l2Device {
    fn drop(&mut self) {
        log::info!("V4l2Device: released {}", self.path);
    }
}

/// Bytes of pixel data in one row (one luma row for NV12).
fn row_bytes(format: PixelFormat, width: u32) -> usize {
    let width = width as usize;
    match format {
        PixelFormat::Rgb24 | PixelFormat::Bgr24 => width * 3,
        PixelFormat::Yuyv => width * 2,
        PixelFormat::Nv12 => width,
    }
}

/// Rows in the buffer, counting the interleaved chroma plane of NV12.
fn row_count(format: PixelFormat, height: u32) -> usize {
    let height = height as usize;
    match format {
        PixelFormat::Nv12 => height + height / 2,
        _ => height,
    }
}

/// Copy `rows` rows of `row_bytes` out of a buffer laid out `stride` bytes
/// per row. A stride of 0 or equal to `row_bytes` means the rows are packed.
fn strip_row_padding(buf: &[u8], stride: usize, row_bytes: usize, rows: usize) -> Result<Vec<u8>> {
    if stride == 0 || stride == row_bytes {
        return Ok(buf.to_vec());
    }
    if stride < row_bytes {
        return Err(anyhow!(
            "v4l2 stride {} is shorter than a {}-byte row",
            stride,
            row_bytes
        ));
    }
    let needed = stride * rows.saturating_sub(1) + row_bytes;
    if rows > 0 && buf.len() < needed {
        return Err(anyhow!(
            "v4l2 buffer holds {} bytes, {} rows at stride {} need {}",
            buf.len(),
            rows,
            stride,
            needed
        ));
    }
    let mut packed = Vec::with_capacity(row_bytes * rows);
    for row in buf.chunks(stride).take(rows) {
        packed.extend_from_slice(&row[..row_bytes]);
    }
    Ok(packed)
}

fn pixel_format_for(fourcc: &[u8; 4]) -> Result<PixelFormat> {
    match fourcc {
        b"RGB3" => Ok(PixelFormat::Rgb24),
        b"BGR3" => Ok(PixelFormat::Bgr24),
        b"YUYV" => Ok(PixelFormat::Yuyv),
        b"NV12" => Ok(PixelFormat::Nv12),
        other => Err(anyhow!(
            "unsupported v4l2 pixel format {}",
            String::from_utf8_lossy(other)
        )),
    }
}
