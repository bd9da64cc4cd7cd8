mod body_angles;
mod keypoint;
mod pose;
mod progress;
mod shot;

pub use body_angles::{AnalyzedPose, BodyAngles};
pub use keypoint::{Keypoint, KeypointName, KEYPOINT_COUNT};
pub use pose::{Pose, DEFAULT_MIN_POSE_SCORE, MIN_CONFIDENT_KEYPOINTS};
pub use progress::{ProgressState, Stage};
pub use shot::{Hand, Shot, ShotSegment};
