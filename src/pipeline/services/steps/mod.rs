pub mod angle_calculation_step;
pub mod pose_detection_step;
pub mod shot_segmentation_step;

pub use angle_calculation_step::AngleCalculationStep;
pub use pose_detection_step::PoseDetectionStep;
pub use shot_segmentation_step::ShotSegmentationStep;
