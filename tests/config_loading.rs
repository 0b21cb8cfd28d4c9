use std::io::Write;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use object_detect::config::{AppConfig, ConfigOverrides};
use object_detect::FrameSize;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DETECT_CONFIG",
        "DETECT_SOURCE",
        "DETECT_BACKEND",
        "DETECT_MODEL_PATH",
        "DETECT_CONFIDENCE",
        "DETECT_FRAME_WIDTH",
        "DETECT_FRAME_HEIGHT",
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
        "source": "data/sample_videos/sample.mp4",
        "detector": {
            "backend": "tract",
            "model_path": "models/custom.onnx",
            "labels_path": "models/custom.names",
            "confidence": 0.6,
            "input_width": 320,
            "input_height": 320
        },
        "frame": {
            "width": 800,
            "height": 600
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("DETECT_CONFIG", file.path());
    std::env::set_var("DETECT_CONFIDENCE", "0.3");
    std::env::set_var("DETECT_FRAME_HEIGHT", "480");

    let cfg = AppConfig::load().expect("load config");

    assert_eq!(cfg.source, "data/sample_videos/sample.mp4");
    assert_eq!(cfg.detector.backend, "tract");
    assert_eq!(cfg.detector.model_path.to_str(), Some("models/custom.onnx"));
    assert_eq!(
        cfg.detector.labels_path.as_deref().and_then(|p| p.to_str()),
        Some("models/custom.names")
    );
    assert_eq!(cfg.detector.confidence, 0.3);
    assert_eq!(cfg.detector.model_input().unwrap(), FrameSize::new(320, 320).unwrap());
    assert_eq!(cfg.frame.width, Some(800));
    assert_eq!(cfg.frame.height, Some(480));

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
source = "stub://lobby?frames=5"

[detector]
confidence = 0.25

[frame]
width = 320
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = AppConfig::load_from(file.path()).expect("load config");

    assert_eq!(cfg.source, "stub://lobby?frames=5");
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.confidence, 0.25);
    assert_eq!(cfg.frame.width, Some(320));
    assert_eq!(cfg.frame.height, None);

    clear_env();
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AppConfig::load().expect("load config");
    assert_eq!(cfg.source, "stub://sample");
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.confidence, 0.45);
    assert_eq!(cfg.frame.width, None);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECT_CONFIDENCE", "1.5");
    assert!(AppConfig::load().is_err());
    clear_env();

    std::env::set_var("DETECT_CONFIDENCE", "high");
    assert!(AppConfig::load().is_err());
    clear_env();

    std::env::set_var("DETECT_FRAME_WIDTH", "100");
    let err = AppConfig::load().unwrap_err();
    assert!(err.to_string().contains("at least 120"));
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    std::env::set_var("DETECT_CONFIG", file.path());
    assert!(AppConfig::load().is_err());
    clear_env();
}

#[test]
fn command_line_values_win_over_bad_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECT_CONFIDENCE", "high");
    std::env::set_var("DETECT_FRAME_WIDTH", "100");
    std::env::set_var("DETECT_BACKEND", "tract");

    let overrides = ConfigOverrides {
        confidence: Some(0.7),
        frame_width: Some(320),
        ..ConfigOverrides::default()
    };
    let cfg = AppConfig::load_with(None, &overrides).expect("load config");
    assert_eq!(cfg.detector.confidence, 0.7);
    assert_eq!(cfg.frame.width, Some(320));
    assert_eq!(cfg.detector.backend, "tract");

    assert!(AppConfig::load_with(None, &ConfigOverrides::default()).is_err());
    clear_env();
}

#[test]
fn command_line_values_are_validated_once_applied() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "detector": { "confidence": 2.0 } }"#)
        .expect("write config");

    let fixed = ConfigOverrides {
        confidence: Some(0.5),
        ..ConfigOverrides::default()
    };
    let cfg = AppConfig::load_with(Some(file.path()), &fixed).expect("load config");
    assert_eq!(cfg.detector.confidence, 0.5);

    let bad = ConfigOverrides {
        confidence: Some(0.0),
        ..ConfigOverrides::default()
    };
    assert!(AppConfig::load_with(Some(file.path()), &bad).is_err());
    clear_env();
}
