use crate::pipeline::types::{BodyAngles, KeypointName, Pose};

type Point = (f64, f64);

/// Angle at `b` formed by `a-b-c`, in degrees within [0, 180]
pub fn three_point_angle(a: Point, b: Point, c: Point) -> f64 {
    let radians = (c.1 - b.1).atan2(c.0 - b.0) - (a.1 - b.1).atan2(a.0 - b.0);
    let degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// Derive joint angles from a pose. Joints with a missing or non-finite keypoint read 0.
pub fn compute_angles(pose: &Pose) -> BodyAngles {
    use KeypointName::*;

    BodyAngles {
        left_elbow: joint(pose, LeftShoulder, LeftElbow, LeftWrist),
        right_elbow: joint(pose, RightShoulder, RightElbow, RightWrist),
        left_knee: joint(pose, LeftHip, LeftKnee, LeftAnkle),
        right_knee: joint(pose, RightHip, RightKnee, RightAnkle),
        left_shoulder: joint(pose, LeftHip, LeftShoulder, LeftElbow),
        right_shoulder: joint(pose, RightHip, RightShoulder, RightElbow),
        left_hip: joint(pose, LeftShoulder, LeftHip, LeftKnee),
        right_hip: joint(pose, RightShoulder, RightHip, RightKnee),
        torso_lean: torso_lean(pose),
    }
}

/// Deviation of the shoulder-to-hip midline from vertical, in [0, 90]. 0 is upright.
pub fn torso_lean(pose: &Pose) -> f64 {
    let shoulders = midpoint(pose, KeypointName::LeftShoulder, KeypointName::RightShoulder);
    let hips = midpoint(pose, KeypointName::LeftHip, KeypointName::RightHip);
    let (Some(shoulders), Some(hips)) = (shoulders, hips) else {
        return 0.0;
    };

    let dx = (shoulders.0 - hips.0).abs();
    let dy = (shoulders.1 - hips.1).abs();
    finite_or_zero(dx.atan2(dy).to_degrees())
}

fn point(pose: &Pose, name: KeypointName) -> Option<Point> {
    pose.landmark(name)
        .filter(|kp| kp.is_finite())
        .map(|kp| (kp.x as f64, kp.y as f64))
}

fn midpoint(pose: &Pose, left: KeypointName, right: KeypointName) -> Option<Point> {
    let l = point(pose, left)?;
    let r = point(pose, right)?;
    Some(((l.0 + r.0) / 2.0, (l.1 + r.1) / 2.0))
}

fn joint(pose: &Pose, a: KeypointName, b: KeypointName, c: KeypointName) -> f64 {
    match (point(pose, a), point(pose, b), point(pose, c)) {
        (Some(a), Some(b), Some(c)) => finite_or_zero(three_point_angle(a, b, c)),
        _ => 0.0,
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
