//! Threaded frame source.
//!
//! `FrameSource` owns the capture device on a dedicated thread and publishes
//! every captured frame into a shared `FrameSlot`. There is no queue: a slow
//! consumer skips frames, a fast one may see the same frame twice.
//!
//! Shutdown order is fixed: raise the stop flag, then join. The device is
//! dropped on the capture thread after the loop observes the flag, so it is
//! always released before `join()` returns.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use super::device::{open_device, CaptureConfig, CaptureDevice};
use super::normalize::normalize_to_rgb;
use crate::error::TrackerError;
use crate::frame::{Frame, FrameSlot};

/// Back-off after a failed read so a dead device does not spin the thread.
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct CaptureCounters {
    frames: AtomicU64,
    failures: AtomicU64,
    failure_streak: AtomicU64,
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub read_failures: u64,
    pub device: String,
}

pub struct FrameSource {
    config: CaptureConfig,
    device_name: String,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
    join: Option<JoinHandle<()>>,
}

impl FrameSource {
    /// Open the configured device and start capturing.
    ///
    /// Fails with `CaptureUnavailable` if the device cannot be opened; in that
    /// case no capture thread is left running.
    pub fn start(config: CaptureConfig) -> Result<Self, TrackerError> {
        Self::start_with(config, open_device)
    }

    /// Like `start`, with a caller-supplied device opener. The opener runs on
    /// the capture thread, which then owns the device for its whole life.
    pub fn start_with<F>(config: CaptureConfig, opener: F) -> Result<Self, TrackerError>
    where
        F: FnOnce(&CaptureConfig) -> Result<Box<dyn CaptureDevice>> + Send + 'static,
    {
        let slot = Arc::new(FrameSlot::new());
        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(CaptureCounters::default());
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String, String>>();

        let thread_config = config.clone();
        let thread_slot = Arc::clone(&slot);
        let thread_stop = Arc::clone(&stop);
        let thread_counters = Arc::clone(&counters);
        let join = std::thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || {
                let device = match opener(&thread_config) {
                    Ok(device) => device,
                    Err(err) => {
                        let _ = ready_tx.send(Err(format!("{:#}", err)));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(device.describe()));
                capture_loop(device, &thread_slot, &thread_stop, &thread_counters);
            })
            .map_err(|err| TrackerError::capture_unavailable(&config.device, &err.into()))?;

        let reason = match ready_rx.recv() {
            Ok(Ok(device_name)) => {
                log::info!(
                    "FrameSource: capturing from {} at {}x{}",
                    device_name,
                    config.width,
                    config.height
                );
                return Ok(Self {
                    config,
                    device_name,
                    slot,
                    stop,
                    counters,
                    join: Some(join),
                });
            }
            Ok(Err(reason)) => reason,
            Err(_) => "capture thread exited before opening the device".to_string(),
        };
        let _ = join.join();
        log::error!("FrameSource: {} unavailable: {}", config.device, reason);
        Err(TrackerError::CaptureUnavailable {
            device: config.device,
            reason,
        })
    }

    /// Most recent frame, or `None` before the first successful capture.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.slot.latest()
    }

    /// Shared handle to the frame slot for consumers.
    pub fn slot(&self) -> Arc<FrameSlot> {
        Arc::clone(&self.slot)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Ask the capture loop to exit after its current iteration.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.join
            .as_ref()
            .is_some_and(|join| !join.is_finished())
    }

    /// Block until the capture thread has exited and released the device.
    /// Raises the stop flag first if nobody did.
    pub fn join(mut self) -> Result<CaptureStats> {
        self.stop();
        self.join_thread()?;
        Ok(self.stats())
    }

    /// Healthy while reads succeed and frames keep arriving.
    pub fn is_healthy(&self) -> bool {
        if self.counters.failure_streak.load(Ordering::Relaxed) > 0 {
            return false;
        }
        match self.slot.latest() {
            Some(frame) => frame.age() <= self.health_grace(),
            None => true,
        }
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.counters.frames.load(Ordering::Relaxed),
            read_failures: self.counters.failures.load(Ordering::Relaxed),
            device: self.device_name.clone(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }

    fn join_thread(&mut self) -> Result<()> {
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("frame capture thread panicked"))?;
            log::info!("FrameSource: capture thread for {} joined", self.device_name);
        }
        Ok(())
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
        if let Err(err) = self.join_thread() {
            log::error!("FrameSource: {}", err);
        }
    }
}

fn capture_loop(
    mut device: Box<dyn CaptureDevice>,
    slot: &FrameSlot,
    stop: &AtomicBool,
    counters: &CaptureCounters,
) {
    let mut seq = 0u64;
    while !stop.load(Ordering::Acquire) {
        let captured = device.read().and_then(|image| {
            let rgb = normalize_to_rgb(&image.pixels, image.width, image.height, image.format)?;
            Frame::from_rgb(seq + 1, image.width, image.height, rgb)
        });
        match captured {
            Ok(frame) => {
                seq = frame.seq;
                slot.publish(frame);
                counters.frames.fetch_add(1, Ordering::Relaxed);
                let streak = counters.failure_streak.swap(0, Ordering::Relaxed);
                if streak > 0 {
                    log::info!(
                        "FrameSource: {} recovered after {} failed reads",
                        device.describe(),
                        streak
                    );
                }
            }
            Err(err) => {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                if counters.failure_streak.fetch_add(1, Ordering::Relaxed) == 0 {
                    log::warn!("FrameSource: read from {} failed: {:#}", device.describe(), err);
                }
                std::thread::sleep(READ_RETRY_DELAY);
            }
        }
    }
    log::debug!("FrameSource: stop observed after {} frames", seq);
    drop(device);
}
