use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::celebrate::CelebrationConfig;
use crate::detect::labels::is_known_label;

const DEFAULT_TARGET_LABEL: &str = "person";
const DEFAULT_THRESHOLD: f32 = 0.7;
const DEFAULT_TICK_MS: u64 = 500;
const DEFAULT_CAMERA_URL: &str = "stub://webcam";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_MODEL_BACKEND: &str = "stub";
const DEFAULT_MODEL_INPUT_SIZE: u32 = 640;
const DEFAULT_MODEL_MIN_SCORE: f32 = 0.25;

/// What the orchestrator looks for, and what it does once found.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionParams {
    pub target_label: String,
    /// Strict lower bound; a detection must score above it to match.
    pub confidence_threshold: f32,
    /// Latch after the first match and stop emitting results.
    pub stop_on_found: bool,
    /// Fire the celebration when the latch engages.
    pub celebrate_on_found: bool,
}

impl DetectionParams {
    /// Parameters with both found-behaviours disabled.
    pub fn new(target_label: impl Into<String>, confidence_threshold: f32) -> Self {
        Self {
            target_label: target_label.into(),
            confidence_threshold,
            stop_on_found: false,
            celebrate_on_found: false,
        }
    }

    pub fn stop_on_found(mut self, enabled: bool) -> Self {
        self.stop_on_found = enabled;
        self
    }

    pub fn celebrate_on_found(mut self, enabled: bool) -> Self {
        self.celebrate_on_found = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_label.trim().is_empty() {
            return Err(anyhow!("target label must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !is_known_label(&self.target_label) {
            log::warn!(
                "target label '{}' is not a COCO class; only custom models can report it",
                self.target_label
            );
        }
        Ok(())
    }
}

/// How a tick behaves while an earlier inference is still running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Skip the tick; at most one inference is in flight.
    #[default]
    SkipWhileBusy,
    /// Start a new inference and discard the outstanding one's result.
    CancelStale,
}

impl std::str::FromStr for OverlapPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "skip_while_busy" | "skip" => Ok(Self::SkipWhileBusy),
            "cancel_stale" | "cancel" => Ok(Self::CancelStale),
            other => Err(anyhow!("unknown overlap policy '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FinderConfigFile {
    detection: Option<DetectionConfigFile>,
    tick_ms: Option<u64>,
    overlap: Option<OverlapPolicy>,
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
    celebration: Option<CelebrationConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    target_label: Option<String>,
    threshold: Option<f32>,
    stop_on_found: Option<bool>,
    celebrate_on_found: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    backend: Option<String>,
    path: Option<PathBuf>,
    input_size: Option<u32>,
    min_score: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct CelebrationConfigFile {
    particle_count: Option<u32>,
    spread: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FinderConfig {
    pub detection: DetectionParams,
    pub tick_interval: Duration,
    pub overlap: OverlapPolicy,
    pub camera: CameraSettings,
    pub model: ModelSettings,
    pub celebration: CelebrationConfig,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub backend: String,
    pub path: Option<PathBuf>,
    pub input_size: u32,
    pub min_score: f32,
}

impl Default for FinderConfig {
    fn default() -> Self {
        // Defaults cannot fail: every section falls back to constants.
        Self::from_file(FinderConfigFile::default())
    }
}

impl FinderConfig {
    /// Load from `FINDER_CONFIG` (JSON) if set, then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FINDER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FinderConfigFile) -> Self {
        let detection = file.detection.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let model = file.model.unwrap_or_default();
        let celebration = file.celebration.unwrap_or_default();
        let default_celebration = CelebrationConfig::default();

        Self {
            detection: DetectionParams {
                target_label: detection
                    .target_label
                    .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
                confidence_threshold: detection.threshold.unwrap_or(DEFAULT_THRESHOLD),
                stop_on_found: detection.stop_on_found.unwrap_or(false),
                celebrate_on_found: detection.celebrate_on_found.unwrap_or(true),
            },
            tick_interval: Duration::from_millis(file.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
            overlap: file.overlap.unwrap_or_default(),
            camera: CameraSettings {
                url: camera.url.unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
                fps: camera.fps.unwrap_or(DEFAULT_CAMERA_FPS),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            },
            model: ModelSettings {
                backend: model
                    .backend
                    .unwrap_or_else(|| DEFAULT_MODEL_BACKEND.to_string()),
                path: model.path,
                input_size: model.input_size.unwrap_or(DEFAULT_MODEL_INPUT_SIZE),
                min_score: model.min_score.unwrap_or(DEFAULT_MODEL_MIN_SCORE),
            },
            celebration: CelebrationConfig {
                particle_count: celebration
                    .particle_count
                    .unwrap_or(default_celebration.particle_count),
                spread: celebration.spread.unwrap_or(default_celebration.spread),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(label) = std::env::var("FINDER_TARGET_LABEL") {
            if !label.trim().is_empty() {
                self.detection.target_label = label.trim().to_string();
            }
        }
        if let Ok(threshold) = std::env::var("FINDER_THRESHOLD") {
            self.detection.confidence_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("FINDER_THRESHOLD must be a number between 0 and 1"))?;
        }
        if let Ok(flag) = std::env::var("FINDER_STOP_ON_FOUND") {
            self.detection.stop_on_found = parse_bool("FINDER_STOP_ON_FOUND", &flag)?;
        }
        if let Ok(flag) = std::env::var("FINDER_CELEBRATE") {
            self.detection.celebrate_on_found = parse_bool("FINDER_CELEBRATE", &flag)?;
        }
        if let Ok(tick) = std::env::var("FINDER_TICK_MS") {
            let ms: u64 = tick
                .trim()
                .parse()
                .map_err(|_| anyhow!("FINDER_TICK_MS must be an integer number of milliseconds"))?;
            self.tick_interval = Duration::from_millis(ms);
        }
        if let Ok(url) = std::env::var("FINDER_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(backend) = std::env::var("FINDER_MODEL_BACKEND") {
            if !backend.trim().is_empty() {
                self.model.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("FINDER_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if self.tick_interval.is_zero() {
            return Err(anyhow!("tick interval must be greater than zero"));
        }
        if self.camera.fps == 0 {
            return Err(anyhow!("camera fps must be >= 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!(
                "camera dimensions must be non-zero, got {}x{}",
                self.camera.width,
                self.camera.height
            ));
        }
        if self.model.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FinderConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{} must be a boolean (true/false)", key)),
    }
}
