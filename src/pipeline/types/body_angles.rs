use super::pose::Pose;
use serde::{Deserialize, Serialize};

/// Joint angles in degrees, each in [0, 180].
///
/// A joint whose keypoints are missing reads 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyAngles {
    pub left_elbow: f64,
    pub right_elbow: f64,
    pub left_knee: f64,
    pub right_knee: f64,
    pub left_shoulder: f64,
    pub right_shoulder: f64,
    pub left_hip: f64,
    pub right_hip: f64,
    pub torso_lean: f64,
}

impl BodyAngles {
    pub fn as_array(&self) -> [f64; 9] {
        [
            self.left_elbow,
            self.right_elbow,
            self.left_knee,
            self.right_knee,
            self.left_shoulder,
            self.right_shoulder,
            self.left_hip,
            self.right_hip,
            self.torso_lean,
        ]
    }

    pub fn from_array(values: [f64; 9]) -> Self {
        Self {
            left_elbow: values[0],
            right_elbow: values[1],
            left_knee: values[2],
            right_knee: values[3],
            left_shoulder: values[4],
            right_shoulder: values[5],
            left_hip: values[6],
            right_hip: values[7],
            torso_lean: values[8],
        }
    }

    /// Element-wise mean, `None` for an empty input
    pub fn mean<'a>(angles: impl IntoIterator<Item = &'a BodyAngles>) -> Option<BodyAngles> {
        let mut sums = [0.0f64; 9];
        let mut count = 0usize;
        for angle in angles {
            for (sum, value) in sums.iter_mut().zip(angle.as_array()) {
                *sum += value;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Self::from_array(sums.map(|sum| sum / count as f64)))
    }
}

/// A valid pose paired with the angles derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedPose {
    pub pose: Pose,
    pub angles: BodyAngles,
}

impl AnalyzedPose {
    pub fn frame_number(&self) -> u32 {
        self.pose.frame_number
    }

    pub fn timestamp_seconds(&self) -> f64 {
        self.pose.timestamp_seconds
    }
}
