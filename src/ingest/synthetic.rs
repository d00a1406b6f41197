//! Synthetic capture device for `stub://` devices.
//!
//! Produces BGR frames (the layout typical webcams deliver) with a bright
//! square bouncing over a dark gradient, so the tracker has a target to follow
//! without hardware.

use anyhow::Result;
use std::time::{Duration, Instant};

use super::device::{CaptureConfig, CaptureDevice, CapturedImage};
use super::normalize::PixelFormat;

const TARGET_SIDE: u32 = 40;
const TARGET_STEP: i64 = 4;

pub struct SyntheticDevice {
    name: String,
    width: u32,
    height: u32,
    frame_interval: Option<Duration>,
    next_frame_at: Option<Instant>,
    frame_count: u64,
}

impl SyntheticDevice {
    pub fn new(name: String, config: &CaptureConfig) -> Self {
        log::info!(
            "SyntheticDevice: opened stub://{} ({}x{})",
            name,
            config.width,
            config.height
        );
        let frame_interval = (config.target_fps > 0)
            .then(|| Duration::from_secs_f64(1.0 / config.target_fps as f64));
        Self {
            name,
            width: config.width,
            height: config.height,
            frame_interval,
            next_frame_at: None,
            frame_count: 0,
        }
    }

    /// Top-left corner of the moving target in frame `n`.
    pub fn target_origin(width: u32, height: u32, n: u64) -> (u32, u32) {
        let span_x = width.saturating_sub(TARGET_SIDE) as i64;
        let span_y = height.saturating_sub(TARGET_SIDE) as i64;
        let travel = n as i64 * TARGET_STEP;
        (bounce(travel, span_x) as u32, bounce(travel / 2, span_y) as u32)
    }

    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        let now = Instant::now();
        let deadline = self.next_frame_at.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_frame_at = Some(deadline.max(now) + interval);
    }

    fn render(&self) -> Vec<u8> {
        let (tx, ty) = Self::target_origin(self.width, self.height, self.frame_count);
        let mut pixels = vec![0u8; (self.width * self.height * 3) as usize];
        for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
            let x = i as u32 % self.width;
            let y = i as u32 / self.width;
            let inside = x >= tx && x < tx + TARGET_SIDE && y >= ty && y < ty + TARGET_SIDE;
            if inside {
                // BGR: warm orange target
                px.copy_from_slice(&[40, 160, 240]);
            } else {
                let shade = ((x + y) / 16 % 48) as u8;
                px.copy_from_slice(&[shade + 30, shade + 20, shade + 10]);
            }
        }
        pixels
    }
}

impl CaptureDevice for SyntheticDevice {
    fn describe(&self) -> String {
        format!("stub://{}", self.name)
    }

    fn read(&mut self) -> Result<CapturedImage> {
        self.pace();
        let pixels = self.render();
        self.frame_count += 1;
        Ok(CapturedImage {
            pixels,
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgr24,
        })
    }
}

impl Drop for SyntheticDevice {
    fn drop(&mut self) {
        log::info!(
            "SyntheticDevice: released stub://{} after {} frames",
            self.name,
            self.frame_count
        );
    }
}

fn bounce(travel: i64, span: i64) -> i64 {
    if span <= 0 {
        return 0;
    }
    let period = span * 2;
    let phase = travel.rem_euclid(period);
    if phase <= span {
        phase
    } else {
        period - phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpaced(width: u32, height: u32) -> CaptureConfig {
        CaptureConfig {
            device: "stub://test".to_string(),
            width,
            height,
            target_fps: 0,
        }
    }

    #[test]
    fn produces_bgr_frames_of_configured_size() -> Result<()> {
        let mut device = SyntheticDevice::new("test".into(), &unpaced(320, 240));
        let image = device.read()?;
        assert_eq!(image.format, PixelFormat::Bgr24);
        assert_eq!(image.pixels.len(), 320 * 240 * 3);
        Ok(())
    }

    #[test]
    fn target_moves_between_frames() -> Result<()> {
        let a = SyntheticDevice::target_origin(640, 480, 0);
        let b = SyntheticDevice::target_origin(640, 480, 1);
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn target_stays_inside_frame() {
        for n in 0..2_000 {
            let (x, y) = SyntheticDevice::target_origin(640, 480, n);
            assert!(x + TARGET_SIDE <= 640);
            assert!(y + TARGET_SIDE <= 480);
        }
    }
}
