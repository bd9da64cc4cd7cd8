pub mod angle_calculator;
pub mod shot_aggregator;
pub mod shot_detector;

pub use angle_calculator::compute_angles;
pub use shot_aggregator::ShotAggregator;
pub use shot_detector::ShotDetector;
