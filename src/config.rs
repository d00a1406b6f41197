use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::ingest::CaptureConfig;
use crate::track::TemplateParams;

const DEFAULT_DEVICE: &str = "stub://camera";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_TICK_MS: u64 = 33;
const DEFAULT_BACKEND: &str = "template";

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    capture: Option<CaptureConfigFile>,
    render: Option<RenderConfigFile>,
    tracker: Option<TrackerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    tick_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    backend: Option<String>,
    search_margin: Option<u32>,
    max_mean_diff: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub tick: Duration,
    pub backend: String,
    pub template: TemplateParams,
}

impl AppConfig {
    /// Load from the file named by `ROI_TRACKER_CONFIG` (if set), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ROI_TRACKER_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (if any), then apply environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let capture = file.capture.unwrap_or_default();
        let render = file.render.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        let defaults = TemplateParams::default();
        Self {
            capture: CaptureConfig {
                device: capture
                    .device
                    .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
                width: capture.width.unwrap_or(DEFAULT_WIDTH),
                height: capture.height.unwrap_or(DEFAULT_HEIGHT),
                target_fps: capture.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
            },
            tick: Duration::from_millis(render.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
            backend: tracker
                .backend
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            template: TemplateParams {
                search_margin: tracker.search_margin.unwrap_or(defaults.search_margin),
                max_mean_diff: tracker.max_mean_diff.unwrap_or(defaults.max_mean_diff),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("ROI_TRACKER_DEVICE") {
            if !device.trim().is_empty() {
                self.capture.device = device;
            }
        }
        if let Some(width) = env_number::<u32>("ROI_TRACKER_WIDTH")? {
            self.capture.width = width;
        }
        if let Some(height) = env_number::<u32>("ROI_TRACKER_HEIGHT")? {
            self.capture.height = height;
        }
        if let Some(fps) = env_number::<u32>("ROI_TRACKER_FPS")? {
            self.capture.target_fps = fps;
        }
        if let Some(tick_ms) = env_number::<u64>("ROI_TRACKER_TICK_MS")? {
            self.tick = Duration::from_millis(tick_ms);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.capture.device.trim().is_empty() {
            return Err(anyhow!("capture device must not be empty"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!(
                "capture resolution must be non-zero, got {}x{}",
                self.capture.width,
                self.capture.height
            ));
        }
        if self.tick.is_zero() {
            return Err(anyhow!("render tick must be greater than zero"));
        }
        if self.template.max_mean_diff.is_nan() || self.template.max_mean_diff <= 0.0 {
            return Err(anyhow!("tracker max_mean_diff must be positive"));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a non-negative integer", key)),
        _ => Ok(None),
    }
}
