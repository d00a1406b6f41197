use std::time::{Duration, Instant};

/// Number of displayed frames between FPS publications.
pub const FPS_WINDOW: u32 = 10;

/// Windowed frame-rate counter.
///
/// The render loop calls `update()` once per displayed frame; once
/// `window_complete()` it calls `stop()`, publishes `fps()` and `start()`s the
/// next window.
#[derive(Clone, Debug)]
pub struct FpsMeter {
    start: Instant,
    end: Option<Instant>,
    frames: u32,
    window: u32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::with_window(FPS_WINDOW)
    }

    pub fn with_window(window: u32) -> Self {
        Self {
            start: Instant::now(),
            end: None,
            frames: 0,
            window: window.max(1),
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, at: Instant) {
        self.start = at;
        self.end = None;
        self.frames = 0;
    }

    pub fn update(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn stop_at(&mut self, at: Instant) {
        self.end = Some(at);
    }

    pub fn count(&self) -> u32 {
        self.frames
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn window_complete(&self) -> bool {
        self.frames >= self.window
    }

    /// Time between `start()` and `stop()`; `None` until stopped.
    pub fn elapsed(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_duration_since(self.start))
    }

    /// Frames per second over the stopped window. `None` before `stop()` or
    /// when no time has elapsed.
    pub fn fps(&self) -> Option<f64> {
        let secs = self.elapsed()?.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }
        Some(self.frames as f64 / secs)
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Host label text for a measured rate.
pub fn format_fps_label(fps: f64) -> String {
    format!("  FPS: {:.2}", fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_updates_over_half_a_second_is_twenty_fps() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::new();
        meter.start_at(t0);
        for _ in 0..10 {
            meter.update();
        }
        assert!(meter.window_complete());
        meter.stop_at(t0 + Duration::from_millis(500));

        let fps = meter.fps().unwrap();
        assert!((fps - 20.0).abs() < 1e-9);
    }

    #[test]
    fn fps_is_undefined_before_stop() {
        let mut meter = FpsMeter::new();
        meter.start();
        meter.update();
        assert!(meter.elapsed().is_none());
        assert!(meter.fps().is_none());
    }

    #[test]
    fn start_resets_counter() {
        let mut meter = FpsMeter::new();
        for _ in 0..7 {
            meter.update();
        }
        meter.start();
        assert_eq!(meter.count(), 0);
        assert!(!meter.window_complete());
    }

    #[test]
    fn label_uses_two_decimals_and_leading_spaces() {
        assert_eq!(format_fps_label(29.8765), "  FPS: 29.88");
    }
}
