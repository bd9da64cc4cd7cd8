use crate::error::AppError;
use crate::pipeline::services::biomechanics::compute_angles;
use crate::pipeline::services::orchestration::{BatchContext, BatchStep, JobAccumulator};
use crate::pipeline::services::pose::PoseEstimator;
use crate::pipeline::types::AnalyzedPose;
use async_trait::async_trait;
use tracing::debug;

/// Processing step that filters out weak poses and derives joint angles for the rest
pub struct AngleCalculationStep {
    min_pose_score: f32,
}

impl AngleCalculationStep {
    pub fn new(min_pose_score: f32) -> Self {
        Self { min_pose_score }
    }
}

#[async_trait]
impl BatchStep for AngleCalculationStep {
    async fn process(
        &mut self,
        batch: &mut BatchContext,
        acc: &mut JobAccumulator,
    ) -> Result<(), AppError> {
        for pose in std::mem::take(&mut batch.poses) {
            if !PoseEstimator::is_valid(&pose, self.min_pose_score) {
                debug!(
                    "Frame {}: rejected pose (score {:.2}, {} confident keypoints)",
                    pose.frame_number,
                    pose.overall_score,
                    pose.confident_keypoints(self.min_pose_score)
                );
                acc.invalid_poses += 1;
                continue;
            }
            acc.valid_poses += 1;
            let angles = compute_angles(&pose);
            batch.analyzed.push(AnalyzedPose { pose, angles });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "angle_calculation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShotConfig;
    use crate::pipeline::services::biomechanics::ShotDetector;
    use crate::pipeline::types::Pose;
    use crate::testing::{standing_pose, CapturedLogs};

    #[tokio::test]
    async fn weak_poses_are_counted_and_dropped() {
        let mut batch = BatchContext::new("job", 1, Vec::new());
        batch.poses = vec![
            standing_pose(1, 0.0),
            Pose {
                overall_score: 0.2,
                ..standing_pose(2, 0.1)
            },
        ];
        let mut acc = JobAccumulator::new(ShotDetector::new(ShotConfig::default()));

        AngleCalculationStep::new(0.5)
            .process(&mut batch, &mut acc)
            .await
            .expect("process");

        assert_eq!((acc.valid_poses, acc.invalid_poses), (1, 1));
        assert_eq!(batch.analyzed.len(), 1);
        assert_eq!(batch.analyzed[0].frame_number(), 1);
        assert!(batch.poses.is_empty());
    }

    #[tokio::test]
    async fn rejected_poses_are_logged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let mut batch = BatchContext::new("job", 1, Vec::new());
        batch.poses = vec![Pose {
            overall_score: 0.2,
            ..standing_pose(7, 0.6)
        }];
        let mut acc = JobAccumulator::new(ShotDetector::new(ShotConfig::default()));
        AngleCalculationStep::new(0.5)
            .process(&mut batch, &mut acc)
            .await
            .expect("process");

        let output = logs.contents();
        assert!(
            output.contains("Frame 7: rejected pose (score 0.20, 17 confident keypoints)"),
            "{output}"
        );
    }
}
