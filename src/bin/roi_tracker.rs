//! roi_tracker - headless host for the ROI tracker overlay
//!
//! This binary:
//! 1. Opens the configured capture device (stub://, index or device path)
//! 2. Drives the render loop on its fixed period
//! 3. Optionally replays one drag selection once the first frame arrives
//! 4. Logs FPS publications and keeps the last displayed image
//! 5. Treats Ctrl-C as ESCAPE: stops capture, joins the capture thread

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use image::RgbImage;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roi_tracker::{
    factory_by_name, AppConfig, DisplaySink, OverlayApp, Point, KEY_CODE_ESCAPE,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML when it ends in .toml). Defaults to $ROI_TRACKER_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Capture device: stub://<name>, a device index, or a device path.
    #[arg(long)]
    device: Option<String>,
    /// Tracking backend.
    #[arg(long)]
    backend: Option<String>,
    /// Number of render ticks to run; 0 runs until Ctrl-C.
    #[arg(long, default_value_t = 0)]
    ticks: u64,
    /// Drag selection to replay once a frame is available: x1,y1,x2,y2.
    #[arg(long, value_parser = parse_selection)]
    select: Option<(Point, Point)>,
    /// Write the last displayed image here (PNG) on exit.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Keeps the newest image and mirrors the FPS label into the log.
#[derive(Default)]
struct HeadlessSink {
    last: Option<RgbImage>,
    label: String,
}

impl DisplaySink for HeadlessSink {
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        match &mut self.last {
            Some(last) if last.dimensions() == image.dimensions() => {
                last.copy_from_slice(image.as_raw());
            }
            _ => self.last = Some(image.clone()),
        }
        Ok(())
    }

    fn set_fps_label(&mut self, text: &str) {
        self.label = text.to_string();
        log::info!("{}", text.trim());
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match args.config.as_deref() {
        Some(path) => AppConfig::load_from(Some(path))?,
        None => AppConfig::load()?,
    };
    if let Some(device) = args.device {
        config.capture.device = device;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }

    let factory = factory_by_name(&config.backend, config.template)?;
    let mut app = OverlayApp::start(&config, factory)
        .with_context(|| format!("start capture on {}", config.capture.device))?;
    log::info!(
        "roi_tracker running: device={} backend={} tick={}ms",
        config.capture.device,
        config.backend,
        config.tick.as_millis()
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut sink = HeadlessSink::default();
    let mut pending_selection = args.select;
    let mut remaining = args.ticks;
    app.run(&mut sink, |app| {
        if interrupted.load(Ordering::SeqCst) {
            app.on_key(KEY_CODE_ESCAPE);
            return ControlFlow::Break(());
        }
        if args.ticks > 0 {
            if remaining == 0 {
                return ControlFlow::Break(());
            }
            remaining -= 1;
        }
        if let Some((start, end)) = pending_selection {
            if app.render().latest_frame().is_some() {
                pending_selection = None;
                app.on_press(start);
                if let Err(err) = app.on_release(end) {
                    log::warn!("selection rejected: {}", err);
                }
            }
        }
        ControlFlow::Continue(())
    });

    let stats = app.shutdown()?;
    log::info!(
        "captured {} frames ({} failed reads); last label '{}'",
        stats.frames_captured,
        stats.read_failures,
        sink.label.trim()
    );

    if let Some(path) = args.snapshot {
        let image = sink
            .last
            .ok_or_else(|| anyhow!("no frame was displayed; nothing to snapshot"))?;
        image
            .save(&path)
            .with_context(|| format!("write snapshot {}", path.display()))?;
        log::info!("snapshot written to {}", path.display());
    }
    Ok(())
}

fn parse_selection(value: &str) -> Result<(Point, Point), String> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("selection must be four integers: {}", e))?;
    match parts.as_slice() {
        [x1, y1, x2, y2] => Ok((Point::new(*x1, *y1), Point::new(*x2, *y2))),
        _ => Err(format!("selection needs x1,y1,x2,y2, got {} values", parts.len())),
    }
}
