//! End-to-end pipeline scenarios.
//!
//! Capture runs on a real thread with a fixed-image device; the tracker is
//! the scripted backend so outcomes are deterministic.

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use roi_tracker::ingest::{CapturedImage, PixelFormat};
use roi_tracker::overlay::draw_label;
use roi_tracker::{
    CaptureConfig, CaptureDevice, DisplaySink, FrameSource, InputCommand, OverlayApp, Point,
    Rectangle, Roi, ScriptedFactory, TickOutcome, TrackerError, TrackerPhase, KEY_CODE_ESCAPE,
    KEY_CODE_SPACE, OVERLAY_COLOR, TICK_PERIOD,
};

const GRAY: Rgb<u8> = Rgb([90, 90, 90]);

struct GrayDevice {
    released: Arc<AtomicBool>,
}

impl CaptureDevice for GrayDevice {
    fn describe(&self) -> String {
        "gray".to_string()
    }

    fn read(&mut self) -> Result<CapturedImage> {
        std::thread::sleep(Duration::from_millis(2));
        Ok(CapturedImage {
            pixels: vec![90u8; 640 * 480 * 3],
            width: 640,
            height: 480,
            format: PixelFormat::Rgb24,
        })
    }
}

impl Drop for GrayDevice {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingSink {
    shown: Vec<RgbImage>,
    labels: Vec<String>,
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        self.shown.push(image.clone());
        Ok(())
    }

    fn set_fps_label(&mut self, text: &str) {
        self.labels.push(text.to_string());
    }
}

fn start_app(factory: &ScriptedFactory) -> Result<(OverlayApp, Arc<AtomicBool>)> {
    let released = Arc::new(AtomicBool::new(false));
    let device_released = Arc::clone(&released);
    let config = CaptureConfig {
        device: "gray".to_string(),
        width: 640,
        height: 480,
        target_fps: 0,
    };
    let source = FrameSource::start_with(config, move |_| {
        Ok(Box::new(GrayDevice {
            released: device_released,
        }) as Box<dyn CaptureDevice>)
    })?;
    let app = OverlayApp::with_source(source, Box::new(factory.clone()), TICK_PERIOD);
    Ok((app, released))
}

fn wait_for_frame(app: &OverlayApp) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while app.render().latest_frame().is_none() {
        assert!(Instant::now() < deadline, "no frame captured");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn selection_then_successful_update_draws_box_and_label() -> Result<()> {
    let factory = ScriptedFactory::new();
    let (mut app, _released) = start_app(&factory)?;
    wait_for_frame(&app);

    app.on_press(Point::new(10, 10));
    let armed = app.on_release(Point::new(50, 60))?;
    assert_eq!(armed, Some(Roi::new(10, 10, 40, 50)));
    assert_eq!(app.tracker().phase(), TrackerPhase::Tracking);

    factory.push(Some(Roi::new(12, 11, 40, 50)));
    let mut sink = RecordingSink::default();
    assert_eq!(
        app.tick(&mut sink),
        TickOutcome::Overlay(Roi::new(12, 11, 40, 50))
    );

    let mut expected = RgbImage::from_pixel(640, 480, GRAY);
    Rectangle::new(Point::new(12, 11), Point::new(52, 61)).draw(&mut expected, OVERLAY_COLOR, 2);
    draw_label(&mut expected, "40x50", Point::new(17, 6), OVERLAY_COLOR, 1);

    let shown = &sink.shown[0];
    assert_eq!(*shown.get_pixel(12, 11), OVERLAY_COLOR);
    assert_eq!(*shown.get_pixel(52, 61), OVERLAY_COLOR);
    assert!(shown == &expected, "overlay differs from box + \"40x50\" label");

    app.shutdown()?;
    Ok(())
}

#[test]
fn tracking_failure_shows_raw_frame_and_stays_tracking() -> Result<()> {
    let factory = ScriptedFactory::new();
    let (mut app, _released) = start_app(&factory)?;
    wait_for_frame(&app);

    app.on_press(Point::new(100, 100));
    app.on_release(Point::new(140, 150))?;
    factory.push(None);

    let mut sink = RecordingSink::default();
    assert_eq!(app.tick(&mut sink), TickOutcome::Lost);
    assert!(sink.shown[0] == RgbImage::from_pixel(640, 480, GRAY));
    assert_eq!(app.tracker().phase(), TrackerPhase::Tracking);

    assert!(matches!(app.tick(&mut sink), TickOutcome::Overlay(_)));

    app.shutdown()?;
    Ok(())
}

#[test]
fn space_cancels_tracking() -> Result<()> {
    let factory = ScriptedFactory::new();
    let (mut app, _released) = start_app(&factory)?;
    wait_for_frame(&app);

    app.on_press(Point::new(0, 0));
    app.on_release(Point::new(20, 20))?;
    assert_eq!(app.on_key(KEY_CODE_SPACE), InputCommand::None);
    assert_eq!(app.tracker().phase(), TrackerPhase::Idle);
    assert_eq!(factory.live_instances(), 0);

    let mut sink = RecordingSink::default();
    assert_eq!(app.tick(&mut sink), TickOutcome::Raw);

    app.shutdown()?;
    Ok(())
}

#[test]
fn escape_stops_capture_and_releases_device() -> Result<()> {
    let factory = ScriptedFactory::new();
    let (mut app, released) = start_app(&factory)?;
    wait_for_frame(&app);
    assert!(app.source().is_running());

    assert_eq!(app.on_key(KEY_CODE_ESCAPE), InputCommand::Quit);
    assert!(app.quit_requested());

    let mut sink = RecordingSink::default();
    let mut ran = 0;
    app.run(&mut sink, |_| {
        ran += 1;
        std::ops::ControlFlow::Continue(())
    });
    assert_eq!(ran, 1);
    assert!(sink.shown.is_empty());

    let stats = app.shutdown()?;
    assert!(released.load(Ordering::SeqCst));
    assert!(stats.frames_captured >= 1);
    assert_eq!(stats.device, "gray");
    Ok(())
}

#[test]
fn run_ticks_until_the_host_breaks() -> Result<()> {
    let factory = ScriptedFactory::new();
    let (mut app, _released) = start_app(&factory)?;
    wait_for_frame(&app);

    let mut sink = RecordingSink::default();
    let mut remaining = 3;
    app.run(&mut sink, |_| {
        if remaining == 0 {
            return std::ops::ControlFlow::Break(());
        }
        remaining -= 1;
        std::ops::ControlFlow::Continue(())
    });
    assert_eq!(sink.shown.len(), 3);
    assert_eq!(app.render().ticks(), 3);
    assert!(!app.quit_requested());

    app.shutdown()?;
    Ok(())
}

#[test]
fn dropping_the_app_still_joins_capture() -> Result<()> {
    let factory = ScriptedFactory::new();
    let (app, released) = start_app(&factory)?;
    wait_for_frame(&app);
    drop(app);
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn unavailable_device_fails_startup() {
    let config = roi_tracker::AppConfig {
        capture: CaptureConfig {
            device: "rtsp://not-a-camera".to_string(),
            ..CaptureConfig::default()
        },
        ..roi_tracker::AppConfig::default()
    };
    let factory = ScriptedFactory::new();
    match OverlayApp::start(&config, Box::new(factory)) {
        Err(TrackerError::CaptureUnavailable { device, .. }) => {
            assert_eq!(device, "rtsp://not-a-camera");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("startup must fail"),
    }
}

#[test]
fn fps_over_ten_updates_matches_elapsed_time() {
    let mut meter = roi_tracker::FpsMeter::new();
    meter.start();
    for _ in 0..10 {
        std::thread::sleep(Duration::from_millis(3));
        meter.update();
    }
    meter.stop();

    let elapsed = meter.elapsed().expect("stopped").as_secs_f64();
    let fps = meter.fps().expect("fps after stop");
    assert!((fps - 10.0 / elapsed).abs() < 1e-9);
}
