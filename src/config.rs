use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::Confidence;
use crate::frame::FrameSize;

const DEFAULT_SOURCE: &str = "stub://sample";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "models/yolov5s.onnx";
const DEFAULT_MODEL_INPUT: u32 = 640;

/// Smallest custom frame side accepted.
pub const MIN_FRAME_DIM: u32 = 120;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    source: Option<String>,
    detector: Option<DetectorConfigFile>,
    frame: Option<FrameConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    confidence: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: String,
    pub detector: DetectorSettings,
    pub frame: FrameSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub confidence: f32,
    pub input_width: u32,
    pub input_height: u32,
}

/// Custom frame size. Unset sides fall back to the source's native size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FrameSettings {
    pub fn resolve(&self, native: FrameSize) -> Result<FrameSize> {
        FrameSize::new(
            self.width.unwrap_or(native.width),
            self.height.unwrap_or(native.height),
        )
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if let Some(value) = value {
                if value < MIN_FRAME_DIM {
                    return Err(anyhow!(
                        "frame {} must be at least {}, got {}",
                        name,
                        MIN_FRAME_DIM,
                        value
                    ));
                }
            }
        }
        Ok(())
    }
}

impl DetectorSettings {
    pub fn confidence(&self) -> Result<Confidence> {
        Confidence::new(self.confidence)
    }

    pub fn model_input(&self) -> Result<FrameSize> {
        FrameSize::new(self.input_width, self.input_height)
    }
}

/// Values set on the command line. A set field wins over both the config
/// file and its `DETECT_*` variable, so a malformed variable is ignored.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<String>,
    pub backend: Option<String>,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub confidence: Option<f32>,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
}

impl AppConfig {
    /// Defaults, then the file named by `DETECT_CONFIG`, then `DETECT_*` env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DETECT_CONFIG").ok();
        Self::load_with(
            config_path.as_deref().map(Path::new),
            &ConfigOverrides::default(),
        )
    }

    /// Load from an explicit file path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(Some(path), &ConfigOverrides::default())
    }

    /// Defaults, optional file, env, then `overrides`; validated once at the end.
    pub fn load_with(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env(overrides)?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let source = file.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        let detector = file.detector.unwrap_or_default();
        let frame = file.frame.unwrap_or_default();
        Self {
            source,
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                labels_path: detector.labels_path,
                confidence: detector
                    .confidence
                    .unwrap_or(crate::detect::DEFAULT_CONFIDENCE),
                input_width: detector.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
                input_height: detector.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            },
            frame: FrameSettings {
                width: frame.width,
                height: frame.height,
            },
        }
    }

    fn apply_env(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        let env = |key: &str, overridden: bool| {
            if overridden {
                None
            } else {
                std::env::var(key).ok()
            }
        };
        if let Some(source) = env("DETECT_SOURCE", overrides.source.is_some()) {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Some(backend) = env("DETECT_BACKEND", overrides.backend.is_some()) {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Some(path) = env("DETECT_MODEL_PATH", overrides.model_path.is_some()) {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Some(confidence) = env("DETECT_CONFIDENCE", overrides.confidence.is_some()) {
            self.detector.confidence = confidence
                .parse()
                .map_err(|_| anyhow!("DETECT_CONFIDENCE must be a number in (0, 1]"))?;
        }
        if let Some(width) = env("DETECT_FRAME_WIDTH", overrides.frame_width.is_some()) {
            self.frame.width = Some(
                width
                    .parse()
                    .map_err(|_| anyhow!("DETECT_FRAME_WIDTH must be an integer"))?,
            );
        }
        if let Some(height) = env("DETECT_FRAME_HEIGHT", overrides.frame_height.is_some()) {
            self.frame.height = Some(
                height
                    .parse()
                    .map_err(|_| anyhow!("DETECT_FRAME_HEIGHT must be an integer"))?,
            );
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(source) = &overrides.source {
            self.source = source.clone();
        }
        if let Some(backend) = &overrides.backend {
            self.detector.backend = backend.clone();
        }
        if let Some(path) = &overrides.model_path {
            self.detector.model_path = path.clone();
        }
        if let Some(path) = &overrides.labels_path {
            self.detector.labels_path = Some(path.clone());
        }
        if let Some(confidence) = overrides.confidence {
            self.detector.confidence = confidence;
        }
        if overrides.frame_width.is_some() {
            self.frame.width = overrides.frame_width;
        }
        if overrides.frame_height.is_some() {
            self.frame.height = overrides.frame_height;
        }
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        if self.detector.backend.trim().is_empty() {
            return Err(anyhow!("detector backend must not be empty"));
        }
        self.detector.confidence()?;
        self.detector.model_input()?;
        self.frame.validate()
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
    let cfg: AppConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
