use crate::pipeline::types::{AnalyzedPose, BodyAngles, Shot, ShotSegment};

/// Turns raw detector segments into the final, numbered shot list
#[derive(Debug, Clone)]
pub struct ShotAggregator {
    merge_gap_seconds: f64,
}

impl ShotAggregator {
    pub fn new(merge_gap_seconds: f64) -> Self {
        Self { merge_gap_seconds }
    }

    pub fn aggregate(&self, segments: Vec<ShotSegment>, poses: &[AnalyzedPose]) -> Vec<Shot> {
        merge_segments(segments, self.merge_gap_seconds)
            .iter()
            .enumerate()
            .map(|(i, segment)| summarize(i + 1, segment, poses))
            .collect()
    }
}

/// Merge segments separated by no more than `merge_gap_seconds`
pub fn merge_segments(mut segments: Vec<ShotSegment>, merge_gap_seconds: f64) -> Vec<ShotSegment> {
    segments.sort_by_key(|s| s.start_frame);

    let mut merged: Vec<ShotSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last) if segment.start_time - last.end_time <= merge_gap_seconds => {
                last.merge(&segment)
            }
            _ => merged.push(segment),
        }
    }
    merged
}

fn summarize(index: usize, segment: &ShotSegment, poses: &[AnalyzedPose]) -> Shot {
    let in_span: Vec<&AnalyzedPose> = poses
        .iter()
        .filter(|p| (segment.start_frame..=segment.end_frame).contains(&p.frame_number()))
        .collect();

    // Closest pose to the peak, in case the peak frame itself was filtered out
    let contact_angles = in_span
        .iter()
        .min_by_key(|p| p.frame_number().abs_diff(segment.peak_frame))
        .map(|p| p.angles);

    Shot {
        index,
        hand: segment.hand,
        start_frame: segment.start_frame,
        end_frame: segment.end_frame,
        start_time: segment.start_time,
        end_time: segment.end_time,
        duration_seconds: (segment.end_time - segment.start_time).max(0.0),
        peak_frame: segment.peak_frame,
        peak_time: segment.peak_time,
        peak_wrist_speed: segment.peak_speed,
        contact_angles,
        mean_angles: BodyAngles::mean(in_span.iter().map(|p| &p.angles)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Hand;
    use crate::testing::{analyzed, standing_pose};

    fn segment(start: u32, end: u32, peak: u32, speed: f64) -> ShotSegment {
        let t = |frame: u32| (frame - 1) as f64 / 10.0;
        ShotSegment {
            start_frame: start,
            end_frame: end,
            start_time: t(start),
            end_time: t(end),
            peak_frame: peak,
            peak_time: t(peak),
            peak_speed: speed,
            hand: Hand::Right,
            active_samples: (end - start) as usize,
        }
    }

    #[test]
    fn close_segments_are_merged_and_keep_the_faster_peak() {
        let merged = merge_segments(
            vec![segment(20, 24, 22, 3.0), segment(3, 6, 4, 4.0), segment(8, 10, 9, 6.0)],
            0.35,
        );

        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start_frame, merged[0].end_frame), (3, 10));
        assert_eq!(merged[0].peak_frame, 9);
        assert_eq!(merged[0].active_samples, 5);
        assert_eq!((merged[1].start_frame, merged[1].end_frame), (20, 24));
    }

    #[test]
    fn shots_are_numbered_and_carry_angles() {
        let poses: Vec<AnalyzedPose> = (1..=12)
            .map(|frame| analyzed(standing_pose(frame, (frame - 1) as f64 / 10.0)))
            .collect();
        let aggregator = ShotAggregator::new(0.1);

        let shots = aggregator.aggregate(vec![segment(2, 4, 3, 5.0), segment(9, 11, 10, 4.0)], &poses);

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].index, 1);
        assert_eq!(shots[1].index, 2);
        assert!((shots[0].duration_seconds - 0.2).abs() < 1e-9);
        let contact = shots[0].contact_angles.expect("contact angles");
        assert_eq!(contact, poses[2].angles);
        let mean = shots[1].mean_angles.expect("mean angles");
        for (got, want) in mean.as_array().iter().zip(poses[9].angles.as_array()) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn shot_without_poses_has_no_angles() {
        let shots = ShotAggregator::new(0.0).aggregate(vec![segment(2, 4, 3, 5.0)], &[]);
        assert_eq!(shots.len(), 1);
        assert!(shots[0].contact_angles.is_none());
        assert!(shots[0].mean_angles.is_none());
    }
}
