use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use object_finder::config::{FinderConfig, OverlapPolicy};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FINDER_CONFIG",
        "FINDER_TARGET_LABEL",
        "FINDER_THRESHOLD",
        "FINDER_STOP_ON_FOUND",
        "FINDER_CELEBRATE",
        "FINDER_TICK_MS",
        "FINDER_CAMERA_URL",
        "FINDER_MODEL_BACKEND",
        "FINDER_MODEL_PATH",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "detection": {
                "target_label": "cup",
                "threshold": 0.55,
                "stop_on_found": true,
                "celebrate_on_found": false
            },
            "tick_ms": 250,
            "overlap": "cancel_stale",
            "camera": {
                "url": "stub://kitchen",
                "fps": 15,
                "width": 320,
                "height": 240
            },
            "model": {
                "backend": "tract",
                "path": "models/yolov8n.onnx",
                "input_size": 320,
                "min_score": 0.3
            },
            "celebration": {
                "particle_count": 120
            }
        }"#,
    );

    std::env::set_var("FINDER_CONFIG", file.path());
    std::env::set_var("FINDER_TARGET_LABEL", "bottle");
    std::env::set_var("FINDER_CELEBRATE", "yes");
    std::env::set_var("FINDER_TICK_MS", "100");

    let cfg = FinderConfig::load().expect("load config");

    assert_eq!(cfg.detection.target_label, "bottle");
    assert_eq!(cfg.detection.confidence_threshold, 0.55);
    assert!(cfg.detection.stop_on_found);
    assert!(cfg.detection.celebrate_on_found);
    assert_eq!(cfg.tick_interval, Duration::from_millis(100));
    assert_eq!(cfg.overlap, OverlapPolicy::CancelStale);
    assert_eq!(cfg.camera.url, "stub://kitchen");
    assert_eq!(cfg.camera.fps, 15);
    assert_eq!((cfg.camera.width, cfg.camera.height), (320, 240));
    assert_eq!(cfg.model.backend, "tract");
    assert_eq!(
        cfg.model.path.as_deref(),
        Some(std::path::Path::new("models/yolov8n.onnx"))
    );
    assert_eq!(cfg.model.input_size, 320);
    assert_eq!(cfg.celebration.particle_count, 120);
    assert_eq!(cfg.celebration.spread, 200.0);

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = FinderConfig::load().expect("load defaults");
    assert_eq!(cfg.detection.target_label, "person");
    assert_eq!(cfg.detection.confidence_threshold, 0.7);
    assert!(!cfg.detection.stop_on_found);
    assert_eq!(cfg.tick_interval, Duration::from_millis(500));
    assert_eq!(cfg.camera.url, "stub://webcam");
    assert_eq!(cfg.model.backend, "stub");
}

#[test]
fn rejects_out_of_range_threshold() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FINDER_THRESHOLD", "1.2");
    let err = FinderConfig::load().unwrap_err();
    assert!(err.to_string().contains("within [0, 1]"));

    std::env::set_var("FINDER_THRESHOLD", "high");
    assert!(FinderConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_bad_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FINDER_TICK_MS", "0");
    assert!(FinderConfig::load().is_err());
    clear_env();

    std::env::set_var("FINDER_STOP_ON_FOUND", "sometimes");
    assert!(FinderConfig::load().is_err());
    clear_env();

    let file = write_config(r#"{ "camera": { "fps": 0 } }"#);
    std::env::set_var("FINDER_CONFIG", file.path());
    assert!(FinderConfig::load().is_err());
    clear_env();

    let file = write_config("not json");
    std::env::set_var("FINDER_CONFIG", file.path());
    let err = FinderConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));
    clear_env();
}
