use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use roi_tracker::config::AppConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ROI_TRACKER_CONFIG",
        "ROI_TRACKER_DEVICE",
        "ROI_TRACKER_WIDTH",
        "ROI_TRACKER_HEIGHT",
        "ROI_TRACKER_FPS",
        "ROI_TRACKER_TICK_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "capture": {
            "device": "/dev/video2",
            "width": 800,
            "height": 600,
            "target_fps": 15
        },
        "render": { "tick_ms": 40 },
        "tracker": { "backend": "template", "search_margin": 32 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("ROI_TRACKER_CONFIG", file.path());
    std::env::set_var("ROI_TRACKER_DEVICE", "stub://bench");
    std::env::set_var("ROI_TRACKER_TICK_MS", "20");

    let cfg = AppConfig::load().expect("load config");

    assert_eq!(cfg.capture.device, "stub://bench");
    assert_eq!(cfg.capture.width, 800);
    assert_eq!(cfg.capture.height, 600);
    assert_eq!(cfg.capture.target_fps, 15);
    assert_eq!(cfg.tick, Duration::from_millis(20));
    assert_eq!(cfg.backend, "template");
    assert_eq!(cfg.template.search_margin, 32);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [capture]
        device = "1"
        width = 320
        height = 240

        [tracker]
        max_mean_diff = 25.5
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = AppConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.capture.device, "1");
    assert_eq!((cfg.capture.width, cfg.capture.height), (320, 240));
    assert_eq!(cfg.capture.target_fps, 30);
    assert_eq!(cfg.tick, Duration::from_millis(33));
    assert_eq!(cfg.template.max_mean_diff, 25.5);

    clear_env();
}

#[test]
fn rejects_bad_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROI_TRACKER_WIDTH", "wide");
    assert!(AppConfig::load().is_err());
    clear_env();

    std::env::set_var("ROI_TRACKER_TICK_MS", "0");
    assert!(AppConfig::load().is_err());
    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROI_TRACKER_CONFIG", "/nonexistent/roi_tracker.json");
    let err = AppConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}

#[test]
fn explicit_path_wins_over_config_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "capture": { "device": "stub://explicit" } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("ROI_TRACKER_CONFIG", "/nonexistent/roi_tracker.json");
    let cfg = AppConfig::load_from(Some(file.path())).expect("load explicit config");
    assert_eq!(cfg.capture.device, "stub://explicit");

    clear_env();
}
