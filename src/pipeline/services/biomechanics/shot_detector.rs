use crate::config::ShotConfig;
use crate::pipeline::types::{AnalyzedPose, Hand, KeypointName, Pose, ShotSegment};
use tracing::debug;

type Point = (f64, f64);

/// Shorter torsos than this (in pixels) are treated as unmeasurable
const MIN_TORSO_LENGTH: f64 = 1.0;

/// Wrist positions of one pose, with the torso length used to normalize speed
#[derive(Debug, Clone)]
struct WristSample {
    frame_number: u32,
    timestamp: f64,
    left: Option<Point>,
    right: Option<Point>,
    torso_length: f64,
}

impl WristSample {
    fn from_pose(pose: &Pose, min_confidence: f32) -> Option<Self> {
        let confident = |name: KeypointName| {
            pose.landmark(name)
                .filter(|kp| kp.is_finite() && kp.confidence >= min_confidence)
                .map(|kp| (kp.x as f64, kp.y as f64))
        };
        let mid = |a: Option<Point>, b: Option<Point>| Some(((a?.0 + b?.0) / 2.0, (a?.1 + b?.1) / 2.0));

        let shoulders = mid(
            confident(KeypointName::LeftShoulder),
            confident(KeypointName::RightShoulder),
        )?;
        let hips = mid(confident(KeypointName::LeftHip), confident(KeypointName::RightHip))?;
        let torso_length = distance(shoulders, hips);
        if torso_length < MIN_TORSO_LENGTH {
            return None;
        }

        Some(Self {
            frame_number: pose.frame_number,
            timestamp: pose.timestamp_seconds,
            left: confident(KeypointName::LeftWrist),
            right: confident(KeypointName::RightWrist),
            torso_length,
        })
    }

    /// Faster wrist between `previous` and `self`, in torso lengths per second
    fn wrist_speed(&self, previous: &WristSample) -> Option<(f64, Hand)> {
        let dt = self.timestamp - previous.timestamp;
        if dt <= 0.0 {
            return None;
        }
        let scale = (self.torso_length + previous.torso_length) / 2.0;
        let speed = |now: Option<Point>, before: Option<Point>| {
            Some(distance(now?, before?) / dt / scale)
        };

        match (
            speed(self.left, previous.left),
            speed(self.right, previous.right),
        ) {
            (Some(l), Some(r)) if l > r => Some((l, Hand::Left)),
            (_, Some(r)) => Some((r, Hand::Right)),
            (Some(l), None) => Some((l, Hand::Left)),
            (None, None) => None,
        }
    }
}

fn distance(a: Point, b: Point) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Streaming wrist-speed hysteresis.
///
/// A segment opens when the faster wrist reaches `start_speed` and stays open
/// while speed holds at or above `end_speed`. It closes on the first slower
/// sample, on a pose gap longer than `max_gap_seconds`, or at `finish`.
pub struct ShotDetector {
    config: ShotConfig,
    previous: Option<WristSample>,
    open: Option<ShotSegment>,
    completed: usize,
}

impl ShotDetector {
    pub fn new(config: ShotConfig) -> Self {
        Self {
            config,
            previous: None,
            open: None,
            completed: 0,
        }
    }

    /// Feed the next pose in frame order. Returns a segment when one closes.
    pub fn push(&mut self, analyzed: &AnalyzedPose) -> Option<ShotSegment> {
        let sample = WristSample::from_pose(&analyzed.pose, self.config.min_keypoint_confidence)?;
        let previous = self.previous.replace(sample.clone())?;

        if sample.timestamp - previous.timestamp > self.config.max_gap_seconds {
            debug!(
                "Pose gap between frames {} and {}",
                previous.frame_number, sample.frame_number
            );
            return self.close();
        }

        let (speed, hand) = sample.wrist_speed(&previous)?;

        if let Some(open) = self.open.as_mut() {
            if speed >= self.config.end_speed {
                open.end_frame = sample.frame_number;
                open.end_time = sample.timestamp;
                open.active_samples += 1;
                if speed > open.peak_speed {
                    open.peak_frame = sample.frame_number;
                    open.peak_time = sample.timestamp;
                    open.peak_speed = speed;
                    open.hand = hand;
                }
                return None;
            }
            return self.close();
        }

        if speed >= self.config.start_speed {
            self.open = Some(ShotSegment {
                start_frame: previous.frame_number,
                end_frame: sample.frame_number,
                start_time: previous.timestamp,
                end_time: sample.timestamp,
                peak_frame: sample.frame_number,
                peak_time: sample.timestamp,
                peak_speed: speed,
                hand,
                active_samples: 1,
            });
        }
        None
    }

    /// Close whatever is still open at the end of the video
    pub fn finish(&mut self) -> Option<ShotSegment> {
        self.previous = None;
        self.close()
    }

    /// Segments emitted so far
    #[cfg(test)]
    pub fn completed_count(&self) -> usize {
        self.completed
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn close(&mut self) -> Option<ShotSegment> {
        let segment = self.open.take()?;
        if segment.active_samples < self.config.min_samples {
            debug!(
                "Dropping short segment {}-{} ({} samples)",
                segment.start_frame, segment.end_frame, segment.active_samples
            );
            return None;
        }
        self.completed += 1;
        debug!(
            "Segment {} closed: frames {}-{}, {} samples",
            self.completed, segment.start_frame, segment.end_frame, segment.active_samples
        );
        Some(segment)
    }
}
