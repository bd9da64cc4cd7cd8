use crate::error::AppError;
use crate::pipeline::services::orchestration::{BatchContext, BatchStep, JobAccumulator};
use crate::pipeline::services::pose::SharedPoseEstimator;
use async_trait::async_trait;

/// Processing step that runs the shared pose estimator over a batch of frames.
///
/// Frames are moved onto the blocking pool and dropped there once inferred.
pub struct PoseDetectionStep {
    estimator: SharedPoseEstimator,
}

impl PoseDetectionStep {
    pub fn new(estimator: SharedPoseEstimator) -> Self {
        Self { estimator }
    }
}

#[async_trait]
impl BatchStep for PoseDetectionStep {
    async fn process(
        &mut self,
        batch: &mut BatchContext,
        acc: &mut JobAccumulator,
    ) -> Result<(), AppError> {
        let frames = std::mem::take(&mut batch.frames);
        let estimator = self.estimator.clone();

        let poses = tokio::task::spawn_blocking(move || estimator.lock().detect_all(&frames))
            .await
            .map_err(|e| AppError::Pipeline(format!("Pose detection task failed: {}", e)))?;

        acc.frames_processed += batch.frame_count() as u32;
        acc.poses_detected += poses.len() as u32;
        if poses.len() < batch.frame_count() {
            tracing::debug!(
                "Batch {}: {} of {} frames had no detection",
                batch.batch_index,
                batch.frame_count() - poses.len(),
                batch.frame_count()
            );
        }
        batch.poses = poses;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pose_detection"
    }
}
