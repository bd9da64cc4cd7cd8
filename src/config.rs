use crate::error::AppError;
use crate::pipeline::types::DEFAULT_MIN_POSE_SCORE;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `SWING__SERVER__PORT=9000`
const ENV_PREFIX: &str = "SWING";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log_level: String,
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
    pub pose: PoseConfig,
    pub analysis: AnalysisConfig,
    pub shots: ShotConfig,
    pub results: ResultsConfig,
    pub progress: ProgressConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            extraction: ExtractionConfig::default(),
            pose: PoseConfig::default(),
            analysis: AnalysisConfig::default(),
            shots: ShotConfig::default(),
            results: ResultsConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Sampling rate in frames per second
    pub target_fps: f64,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Parent for per-job scratch directories, system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_fps: 10.0,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub model_path: PathBuf,
    pub input_name: String,
    pub output_name: String,
    /// Square model input edge in pixels
    pub input_size: u32,
    /// Minimum candidate confidence for the detector head
    pub detection_threshold: f32,
    /// Score threshold used by the validity check
    pub min_pose_score: f32,
    pub intra_threads: usize,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolo11n-pose.onnx"),
            input_name: "images".to_string(),
            output_name: "output0".to_string(),
            input_size: 640,
            detection_threshold: 0.25,
            min_pose_score: DEFAULT_MIN_POSE_SCORE,
            intra_threads: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub batch_size: usize,
    /// Wall-clock ceiling per job, zero disables it
    pub job_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            job_timeout_secs: 600,
        }
    }
}

impl AnalysisConfig {
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

/// Wrist-speed hysteresis settings. Speeds are in torso lengths per second.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShotConfig {
    pub start_speed: f64,
    pub end_speed: f64,
    pub min_samples: usize,
    pub max_gap_seconds: f64,
    pub merge_gap_seconds: f64,
    /// Wrists, shoulders and hips below this confidence are ignored for speed
    pub min_keypoint_confidence: f32,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            start_speed: 2.5,
            end_speed: 1.2,
            min_samples: 1,
            max_gap_seconds: 1.0,
            merge_gap_seconds: 0.35,
            min_keypoint_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Log,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub sink: SinkKind,
    pub dir: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Log,
            dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub max_entries: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

impl Configuration {
    /// Layer an optional config file and `SWING__*` environment variables over the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        configuration.validate().map_err(AppError::Config)?;
        Ok(configuration)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.extraction.target_fps.is_finite() || self.extraction.target_fps <= 0.0 {
            return Err("Target frame rate must be greater than 0".to_string());
        }

        if self.analysis.batch_size == 0 {
            return Err("Batch size must be greater than 0".to_string());
        }

        if self.pose.input_size == 0 {
            return Err("Model input size must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.pose.min_pose_score) {
            return Err("Minimum pose score must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.pose.detection_threshold) {
            return Err("Detection threshold must be between 0.0 and 1.0".to_string());
        }

        if self.shots.end_speed > self.shots.start_speed {
            return Err("Shot end speed must not exceed the start speed".to_string());
        }

        if self.shots.max_gap_seconds < 0.0 || self.shots.merge_gap_seconds < 0.0 {
            return Err("Shot gap settings must not be negative".to_string());
        }

        if self.progress.max_entries == 0 {
            return Err("Progress store capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}
