use super::stage_timings::StageTimings;
use crate::common::Frame;
use crate::pipeline::services::biomechanics::ShotDetector;
use crate::pipeline::types::{AnalyzedPose, Pose, ShotSegment};

/// One fixed-size slice of a job's frames as it moves through the batch steps.
///
/// Each step consumes the previous step's output: frames become poses,
/// poses become analyzed poses.
pub struct BatchContext {
    pub job_id: String,
    /// 1-based
    pub batch_index: u32,
    pub frames: Vec<Frame>,
    pub poses: Vec<Pose>,
    pub analyzed: Vec<AnalyzedPose>,
    frame_count: usize,
}

impl BatchContext {
    pub fn new(job_id: impl Into<String>, batch_index: u32, frames: Vec<Frame>) -> Self {
        Self {
            job_id: job_id.into(),
            batch_index,
            frame_count: frames.len(),
            frames,
            poses: Vec::new(),
            analyzed: Vec::new(),
        }
    }

    /// Frames the batch started with, even after they were consumed
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

/// Job-wide state that outlives individual batches
pub struct JobAccumulator {
    pub shot_detector: ShotDetector,
    pub segments: Vec<ShotSegment>,
    pub analyzed_poses: Vec<AnalyzedPose>,
    pub frames_processed: u32,
    pub poses_detected: u32,
    pub valid_poses: u32,
    pub invalid_poses: u32,
    pub timings: StageTimings,
}

impl JobAccumulator {
    pub fn new(shot_detector: ShotDetector) -> Self {
        Self {
            shot_detector,
            segments: Vec::new(),
            analyzed_poses: Vec::new(),
            frames_processed: 0,
            poses_detected: 0,
            valid_poses: 0,
            invalid_poses: 0,
            timings: StageTimings::new(),
        }
    }
}
