use crate::pipeline::types::{AnalyzedPose, Shot};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// Everything a finished job hands to the result sink
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub job_id: String,
    pub run_id: String,
    pub video_url: String,
    pub total_frames: u32,
    pub frames_analyzed: u32,
    pub poses_detected: u32,
    pub valid_poses: u32,
    pub shots: Vec<Shot>,
    pub poses: Vec<AnalyzedPose>,
    /// Stage and step durations in milliseconds
    pub timings_ms: IndexMap<String, f64>,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn shot_count(&self) -> usize {
        self.shots.len()
    }
}
