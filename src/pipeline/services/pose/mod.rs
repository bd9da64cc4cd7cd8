pub mod pose_estimator;
pub mod pose_model;
pub mod preprocess;
pub mod yolo_pose_model;

pub use pose_estimator::{PoseEstimator, SharedPoseEstimator};
pub use pose_model::PoseModel;
pub use yolo_pose_model::YoloPoseModel;
