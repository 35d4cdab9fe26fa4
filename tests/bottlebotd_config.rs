use std::sync::Mutex;

use tempfile::NamedTempFile;

use bottlebot::config::BotConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "BOTTLEBOT_CONFIG",
        "BOTTLEBOT_CAMERA",
        "BOTTLEBOT_MODEL",
        "BOTTLEBOT_LABELS",
        "BOTTLEBOT_TARGET_LABEL",
        "BOTTLEBOT_SAMPLE_STRIDE",
        "BOTTLEBOT_FORWARD_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "device": "/dev/video0",
            "width": 800,
            "height": 600,
            "vertical_fov_degrees": 41.0
        },
        "detector": {
            "model_path": "models/bottles.onnx",
            "labels_path": "models/bottles.txt",
            "min_confidence": 0.4
        },
        "control": {
            "sample_stride": 4,
            "search_step_degrees": 3.0,
            "forward_secs": 1.2,
            "band_min_cm": 10.0,
            "band_max_cm": 40.0
        },
        "range": {
            "trigger_pin": 20,
            "echo_pin": 21,
            "timeout_ms": 80
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("BOTTLEBOT_CONFIG", file.path());
    std::env::set_var("BOTTLEBOT_CAMERA", "stub://bench");
    std::env::set_var("BOTTLEBOT_FORWARD_SECS", "2.5");

    let cfg = BotConfig::load().expect("load config");

    // Env wins over file for the camera device and forward duration.
    assert_eq!(cfg.camera.device, "stub://bench");
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert!((cfg.camera.vertical_fov_degrees - 41.0).abs() < 1e-9);
    assert_eq!(cfg.detector.model_path, "models/bottles.onnx");
    assert_eq!(cfg.detector.labels_path, "models/bottles.txt");
    assert_eq!(cfg.detector.target_label, "bottle");
    assert!((cfg.detector.min_confidence - 0.4).abs() < 1e-6);
    assert_eq!(cfg.control.sample_stride, 4);
    assert!((cfg.control.forward_secs - 2.5).abs() < 1e-9);
    assert!((cfg.control.band_min_cm - 10.0).abs() < 1e-9);
    assert_eq!(cfg.range.trigger_pin, 20);
    assert_eq!(cfg.range.timeout_ms, 80);
    // Untouched sections keep their defaults.
    assert_eq!(cfg.motors.in1, 17);
    assert_eq!(cfg.servo.right_pin, 26);

    clear_env();
}

#[test]
fn loads_defaults_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = BotConfig::load().expect("load defaults");

    assert_eq!(cfg.camera.device, "stub://camera");
    assert_eq!(cfg.detector.target_label, "bottle");
    assert_eq!(cfg.control.sample_stride, 3);
    assert!((cfg.control.band_max_cm - 35.0).abs() < 1e-9);

    clear_env();
}

#[test]
fn invalid_stride_override_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("BOTTLEBOT_SAMPLE_STRIDE", "0");
    assert!(BotConfig::load().is_err());

    std::env::set_var("BOTTLEBOT_SAMPLE_STRIDE", "not-a-number");
    assert!(BotConfig::load().is_err());

    clear_env();
}
