use super::keypoint::{Keypoint, KeypointName};
use serde::{Deserialize, Serialize};

/// Default score threshold for pose validity
pub const DEFAULT_MIN_POSE_SCORE: f32 = 0.5;

/// Minimum number of confident keypoints for a pose to be usable
pub const MIN_CONFIDENT_KEYPOINTS: usize = 10;

/// The full set of keypoints detected for one subject in one frame.
///
/// Low-confidence keypoints are kept rather than dropped, so `keypoints`
/// always spans the model's whole vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pose {
    pub frame_number: u32,
    pub timestamp_seconds: f64,
    pub keypoints: Vec<Keypoint>,
    pub overall_score: f32,
}

impl Pose {
    /// First keypoint whose name matches `name`
    pub fn keypoint(&self, name: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.matches(name))
    }

    pub fn landmark(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoint(name.as_str())
    }

    pub fn confident_keypoints(&self, min_confidence: f32) -> usize {
        self.keypoints
            .iter()
            .filter(|kp| kp.confidence >= min_confidence)
            .count()
    }

    pub fn is_valid(&self, min_score: f32) -> bool {
        self.overall_score >= min_score
            && self.confident_keypoints(min_score) >= MIN_CONFIDENT_KEYPOINTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose_with(overall_score: f32, confident: usize) -> Pose {
        let keypoints = KeypointName::ALL
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let confidence = if i < confident { 0.9 } else { 0.1 };
                Keypoint::new(name.as_str(), i as f32, i as f32, confidence)
            })
            .collect();
        Pose {
            frame_number: 1,
            timestamp_seconds: 0.0,
            keypoints,
            overall_score,
        }
    }

    #[test]
    fn validity_requires_score_and_ten_confident_keypoints() {
        assert!(pose_with(0.8, 10).is_valid(DEFAULT_MIN_POSE_SCORE));
        assert!(!pose_with(0.8, 9).is_valid(DEFAULT_MIN_POSE_SCORE));
        assert!(!pose_with(0.4, 17).is_valid(DEFAULT_MIN_POSE_SCORE));
        assert!(pose_with(0.5, 17).is_valid(DEFAULT_MIN_POSE_SCORE));
    }

    #[test]
    fn lookup_is_by_name_not_position() {
        let mut pose = pose_with(0.9, 17);
        pose.keypoints.reverse();
        let wrist = pose.landmark(KeypointName::LeftWrist).expect("left wrist");
        assert_eq!(wrist.x, 9.0);
    }
}
