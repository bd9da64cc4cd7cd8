use crate::error::AppError;
use crate::pipeline::services::orchestration::{BatchContext, BatchStep, JobAccumulator};
use async_trait::async_trait;

/// Processing step that feeds analyzed poses to the job's shot detector in frame order
pub struct ShotSegmentationStep;

impl ShotSegmentationStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShotSegmentationStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchStep for ShotSegmentationStep {
    async fn process(
        &mut self,
        batch: &mut BatchContext,
        acc: &mut JobAccumulator,
    ) -> Result<(), AppError> {
        let analyzed = std::mem::take(&mut batch.analyzed);
        for pose in &analyzed {
            if let Some(segment) = acc.shot_detector.push(pose) {
                tracing::debug!(
                    "Shot segment closed at frames {}-{} (peak {:.2})",
                    segment.start_frame,
                    segment.end_frame,
                    segment.peak_speed
                );
                acc.segments.push(segment);
            }
        }
        acc.analyzed_poses.extend(analyzed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "shot_segmentation"
    }
}
