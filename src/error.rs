use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::types::Stage;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Pose model error: {0}")]
    Pose(#[from] PoseError),
    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
    #[error("Failed to hand off results: {0}")]
    ResultHandoff(String),
    #[error("Analysis exceeded the wall-clock limit of {0:?}")]
    Timeout(Duration),
    #[error("Failed to bind to {1}: {0}")]
    Bind(std::io::Error, String),
    #[error("Server error: {0}")]
    Server(std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

// Frame Extraction Error Type
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Target frame rate must be positive, got {0}")]
    InvalidTargetFps(f64),
    #[error("Unreadable source {source_path}: {reason}")]
    UnreadableSource { source_path: String, reason: String },
    #[error("Failed to launch {}: {error}", program.display())]
    Spawn {
        program: PathBuf,
        error: std::io::Error,
    },
    #[error("No frames could be extracted from {0}")]
    NoFrames(String),
    #[error("Scratch directory error: {0}")]
    Scratch(std::io::Error),
    #[error("Frame decoding task failed: {0}")]
    DecodeTask(String),
}

// Pose Estimation Error Type
#[derive(Error, Debug)]
pub enum PoseError {
    #[error("Failed to load pose model: {0}")]
    ModelLoad(String),
    #[error("Pose model used before initialization")]
    NotInitialized,
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Unexpected model output shape: expected {expected}, got {got}")]
    OutputShape { expected: String, got: String },
}

// Progress Store Error Type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgressError {
    #[error("Job {0} is already running")]
    AlreadyRunning(String),
    #[error("Job {0} has not been started")]
    UnknownJob(String),
    #[error("Job {job_id} is already terminal ({stage})")]
    Terminal { job_id: String, stage: Stage },
    #[error("Illegal stage transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: Stage,
        to: Stage,
    },
    #[error("Progress counters for job {0} moved backwards")]
    CounterRegression(String),
}
