use super::body_angles::BodyAngles;
use serde::{Deserialize, Serialize};

/// Which wrist drove the motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

/// Raw burst of wrist motion emitted by the shot detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotSegment {
    pub start_frame: u32,
    pub end_frame: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub peak_frame: u32,
    pub peak_time: f64,
    /// Torso lengths per second
    pub peak_speed: f64,
    pub hand: Hand,
    /// Samples at or above the sustain threshold
    pub active_samples: usize,
}

impl ShotSegment {
    /// Absorb `other` (which must not start before `self`) into this segment
    pub fn merge(&mut self, other: &ShotSegment) {
        self.end_frame = self.end_frame.max(other.end_frame);
        self.end_time = self.end_time.max(other.end_time);
        self.active_samples += other.active_samples;
        if other.peak_speed > self.peak_speed {
            self.peak_frame = other.peak_frame;
            self.peak_time = other.peak_time;
            self.peak_speed = other.peak_speed;
            self.hand = other.hand;
        }
    }
}

/// A finalized shot with summary biomechanics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    /// 1-based position within the video
    pub index: usize,
    pub hand: Hand,
    pub start_frame: u32,
    pub end_frame: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub duration_seconds: f64,
    pub peak_frame: u32,
    pub peak_time: f64,
    pub peak_wrist_speed: f64,
    /// Angles at the peak-speed frame
    pub contact_angles: Option<BodyAngles>,
    /// Mean angles over every analyzed pose in the shot
    pub mean_angles: Option<BodyAngles>,
}
