use super::pose_model::PoseModel;
use crate::common::Frame;
use crate::error::PoseError;
use crate::pipeline::types::Pose;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Process-wide estimator handle, serialized across jobs
pub type SharedPoseEstimator = Arc<Mutex<PoseEstimator>>;

/// Owns the pose model and turns per-frame failures into "no detection"
pub struct PoseEstimator {
    model: Box<dyn PoseModel>,
    initialized: bool,
}

impl PoseEstimator {
    pub fn new(model: Box<dyn PoseModel>) -> Self {
        Self {
            model,
            initialized: false,
        }
    }

    pub fn into_shared(self) -> SharedPoseEstimator {
        Arc::new(Mutex::new(self))
    }

    /// Load the model once; later calls are no-ops
    pub fn initialize(&mut self) -> Result<(), PoseError> {
        if self.initialized {
            return Ok(());
        }
        self.model.initialize()?;
        self.initialized = true;
        debug!("Pose model '{}' ready", self.model.name());
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Pose for a single frame. Inference errors are logged and reported as no detection.
    pub fn detect(&mut self, frame: &Frame) -> Option<Pose> {
        if !self.initialized {
            warn!(
                "Pose model used before initialization, skipping frame {}",
                frame.frame_number()
            );
            return None;
        }
        match self.model.infer(frame) {
            Ok(pose) => pose,
            Err(e) => {
                warn!("Pose inference failed on frame {}: {}", frame.frame_number(), e);
                None
            }
        }
    }

    /// Poses for every frame that produced one, in input order
    pub fn detect_all(&mut self, frames: &[Frame]) -> Vec<Pose> {
        frames.iter().filter_map(|frame| self.detect(frame)).collect()
    }

    pub fn is_valid(pose: &Pose, min_score: f32) -> bool {
        pose.is_valid(min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{blank_frames, ScriptedPoseModel, ScriptedResult};

    #[test]
    fn initialize_is_idempotent() {
        let model = ScriptedPoseModel::new(vec![]);
        let loads = model.load_counter();
        let mut estimator = PoseEstimator::new(Box::new(model));

        estimator.initialize().expect("first");
        estimator.initialize().expect("second");

        assert!(estimator.is_initialized());
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn load_failure_is_reported() {
        let mut estimator = PoseEstimator::new(Box::new(ScriptedPoseModel::failing_load()));
        assert!(matches!(estimator.initialize(), Err(PoseError::ModelLoad(_))));
        assert!(!estimator.is_initialized());
    }

    #[test]
    fn missing_and_failed_detections_are_dropped_in_order() {
        let model = ScriptedPoseModel::new(vec![
            ScriptedResult::Standing,
            ScriptedResult::Nothing,
            ScriptedResult::Error,
            ScriptedResult::Standing,
        ]);
        let mut estimator = PoseEstimator::new(Box::new(model));
        estimator.initialize().expect("init");

        let frames = blank_frames(4, 10.0);
        assert!(estimator.detect(&frames[1]).is_none());

        let poses = estimator.detect_all(&frames);
        let numbers: Vec<u32> = poses.iter().map(|p| p.frame_number).collect();
        assert_eq!(numbers, vec![1, 4]);
    }

    #[test]
    fn uninitialized_estimator_detects_nothing() {
        let mut estimator =
            PoseEstimator::new(Box::new(ScriptedPoseModel::new(vec![ScriptedResult::Standing])));
        let frames = blank_frames(1, 10.0);
        assert!(estimator.detect(&frames[0]).is_none());
    }
}
