use crate::model_package::{PackageSource, DEFAULT_MODEL_EXTENSION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelSourceConfig,
    pub inference: InferenceConfig,
    pub recognizer: RecognizerConfig,
    pub replay: ReplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSourceConfig {
    pub url: Option<String>,
    pub cache_path: Option<PathBuf>,
    pub extension: String,
}

impl Default for ModelSourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            cache_path: None,
            extension: DEFAULT_MODEL_EXTENSION.to_string(),
        }
    }
}

impl ModelSourceConfig {
    pub fn source(&self) -> PackageSource {
        PackageSource {
            cache_path: self.cache_path.clone(),
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub num_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { num_threads: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Inference ticks per second.
    pub clock_speed_hz: f64,
    pub lazy: bool,
    pub lazy_canvas_width: u32,
    pub lazy_canvas_height: u32,
    /// Window cap at push time; the loaded model's memory_frame wins if larger.
    pub max_history_frames: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            clock_speed_hz: 30.0,
            lazy: true,
            lazy_canvas_width: 160,
            lazy_canvas_height: 120,
            max_history_frames: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub input_dir: String,
    pub landmarks_file: String,
    pub framerate: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input_dir: "recordings".to_string(),
            landmarks_file: "landmarks.jsonl".to_string(),
            framerate: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "sign_recognizer=info,ort=warn".to_string(),
        }
    }
}
