//! Fixtures shared by the unit tests

use crate::common::Frame;
use crate::error::{AppError, ExtractionError, PoseError};
use crate::pipeline::services::biomechanics::compute_angles;
use crate::pipeline::services::extraction::{BufferedFrames, FrameBatches, FrameSource};
use crate::pipeline::services::managers::ProgressStore;
use crate::pipeline::services::pose::PoseModel;
use crate::pipeline::services::results::{AnalysisReport, ResultSink};
use crate::pipeline::types::{AnalyzedPose, Keypoint, KeypointName, Pose, ProgressState};
use async_trait::async_trait;
use image::RgbImage;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub fn blank_frames(count: u32, fps: f64) -> Vec<Frame> {
    (1..=count)
        .map(|n| Frame::new(n, (n - 1) as f64 / fps, RgbImage::new(8, 8)))
        .collect()
}

/// Upright subject with a 100px torso, right wrist hanging at (80, 200)
pub fn standing_pose(frame_number: u32, timestamp_seconds: f64) -> Pose {
    let layout = |name: KeypointName| -> (f32, f32) {
        match name {
            KeypointName::Nose => (100.0, 50.0),
            KeypointName::LeftEye => (105.0, 45.0),
            KeypointName::RightEye => (95.0, 45.0),
            KeypointName::LeftEar => (110.0, 50.0),
            KeypointName::RightEar => (90.0, 50.0),
            KeypointName::LeftShoulder => (120.0, 100.0),
            KeypointName::RightShoulder => (80.0, 100.0),
            KeypointName::LeftElbow => (130.0, 150.0),
            KeypointName::RightElbow => (75.0, 150.0),
            KeypointName::LeftWrist => (140.0, 200.0),
            KeypointName::RightWrist => (80.0, 200.0),
            KeypointName::LeftHip => (120.0, 200.0),
            KeypointName::RightHip => (80.0, 200.0),
            KeypointName::LeftKnee => (122.0, 300.0),
            KeypointName::RightKnee => (78.0, 300.0),
            KeypointName::LeftAnkle => (120.0, 400.0),
            KeypointName::RightAnkle => (80.0, 400.0),
        }
    };
    let keypoints = KeypointName::ALL
        .iter()
        .map(|&name| {
            let (x, y) = layout(name);
            Keypoint::new(name.as_str(), x, y, 0.9)
        })
        .collect();
    Pose {
        frame_number,
        timestamp_seconds,
        keypoints,
        overall_score: 0.9,
    }
}

/// Pose holding only the listed keypoints
pub fn pose_from_points(points: &[(KeypointName, f32, f32)]) -> Pose {
    Pose {
        frame_number: 1,
        timestamp_seconds: 0.0,
        keypoints: points
            .iter()
            .map(|&(name, x, y)| Keypoint::new(name.as_str(), x, y, 0.9))
            .collect(),
        overall_score: 0.9,
    }
}

pub fn with_keypoint(mut pose: Pose, name: KeypointName, x: f32, y: f32) -> Pose {
    for kp in pose.keypoints.iter_mut().filter(|kp| kp.name == name.as_str()) {
        kp.x = x;
        kp.y = y;
    }
    pose
}

pub fn analyzed(pose: Pose) -> AnalyzedPose {
    let angles = compute_angles(&pose);
    AnalyzedPose { pose, angles }
}

/// What the scripted model answers for one frame
#[derive(Debug, Clone)]
pub enum ScriptedResult {
    Standing,
    /// Standing, with the right wrist moved to this x
    WristAt(f32),
    /// Detected, but below the default validity score
    Weak,
    Nothing,
    Error,
}

/// Pose model answering from a per-frame script, indexed by frame number
pub struct ScriptedPoseModel {
    script: Vec<ScriptedResult>,
    fail_load: bool,
    loads: Arc<AtomicUsize>,
}

impl ScriptedPoseModel {
    pub fn new(script: Vec<ScriptedResult>) -> Self {
        Self {
            script,
            fail_load: false,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        self.loads.clone()
    }
}

impl PoseModel for ScriptedPoseModel {
    fn initialize(&mut self) -> Result<(), PoseError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(PoseError::ModelLoad("scripted load failure".to_string()));
        }
        Ok(())
    }

    fn infer(&mut self, frame: &Frame) -> Result<Option<Pose>, PoseError> {
        let n = frame.frame_number();
        let ts = frame.timestamp_seconds();
        let step = (n as usize)
            .checked_sub(1)
            .and_then(|i| self.script.get(i))
            .cloned()
            .unwrap_or(ScriptedResult::Nothing);

        Ok(match step {
            ScriptedResult::Standing => Some(standing_pose(n, ts)),
            ScriptedResult::WristAt(x) => Some(with_keypoint(
                standing_pose(n, ts),
                KeypointName::RightWrist,
                x,
                200.0,
            )),
            ScriptedResult::Weak => Some(Pose {
                overall_score: 0.3,
                ..standing_pose(n, ts)
            }),
            ScriptedResult::Nothing => None,
            ScriptedResult::Error => {
                return Err(PoseError::Inference("scripted failure".to_string()))
            }
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Right wrist still at x=80, moving 50px per frame during `moving`
pub fn swing_script(frames: u32, moving: Range<u32>) -> Vec<ScriptedResult> {
    (1..=frames)
        .map(|frame| {
            let moved = moving.clone().filter(|m| *m <= frame).count();
            ScriptedResult::WristAt(80.0 + 50.0 * moved as f32)
        })
        .collect()
}

pub struct StaticFrameSource {
    frames: Vec<Frame>,
}

impl StaticFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

#[async_trait]
impl FrameSource for StaticFrameSource {
    async fn open(
        &self,
        _source: &str,
        _target_fps: f64,
    ) -> Result<Box<dyn FrameBatches>, ExtractionError> {
        Ok(Box::new(BufferedFrames::new(self.frames.clone())))
    }
}

/// Hands out its frames only after `delay`
pub struct SlowFrameSource {
    frames: Vec<Frame>,
    delay: Duration,
}

impl SlowFrameSource {
    pub fn new(frames: Vec<Frame>, delay: Duration) -> Self {
        Self { frames, delay }
    }
}

#[async_trait]
impl FrameSource for SlowFrameSource {
    async fn open(
        &self,
        _source: &str,
        _target_fps: f64,
    ) -> Result<Box<dyn FrameBatches>, ExtractionError> {
        tokio::time::sleep(self.delay).await;
        Ok(Box::new(BufferedFrames::new(self.frames.clone())))
    }
}

pub struct FailingFrameSource;

#[async_trait]
impl FrameSource for FailingFrameSource {
    async fn open(
        &self,
        source: &str,
        _target_fps: f64,
    ) -> Result<Box<dyn FrameBatches>, ExtractionError> {
        Err(ExtractionError::UnreadableSource {
            source_path: source.to_string(),
            reason: "no video stream".to_string(),
        })
    }
}

/// Builds frames only when a batch is requested and records how many were alive at once
pub struct TrackingFrameSource {
    count: u32,
    fps: f64,
    peak: Arc<AtomicUsize>,
}

impl TrackingFrameSource {
    pub fn new(count: u32, fps: f64) -> Self {
        Self {
            count,
            fps,
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn peak_live_frames(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for TrackingFrameSource {
    async fn open(
        &self,
        _source: &str,
        _target_fps: f64,
    ) -> Result<Box<dyn FrameBatches>, ExtractionError> {
        Ok(Box::new(TrackedBatches {
            next: 1,
            count: self.count,
            fps: self.fps,
            handed_out: Vec::new(),
            peak: self.peak.clone(),
        }))
    }
}

struct TrackedBatches {
    next: u32,
    count: u32,
    fps: f64,
    handed_out: Vec<Weak<RgbImage>>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameBatches for TrackedBatches {
    fn total_frames(&self) -> u32 {
        self.count
    }

    async fn next_batch(
        &mut self,
        max_frames: usize,
    ) -> Result<Option<Vec<Frame>>, ExtractionError> {
        if self.next > self.count {
            return Ok(None);
        }
        let take = max_frames.clamp(1, self.count as usize) as u32;
        let last = (self.next + take - 1).min(self.count);
        let batch: Vec<Frame> = (self.next..=last)
            .map(|n| Frame::new(n, (n - 1) as f64 / self.fps, RgbImage::new(8, 8)))
            .collect();
        self.next = last + 1;

        self.handed_out.extend(batch.iter().map(Frame::image_watch));
        let live = self
            .handed_out
            .iter()
            .filter(|image| image.strong_count() > 0)
            .count();
        self.peak.fetch_max(live, Ordering::SeqCst);
        Ok(Some(batch))
    }
}

#[derive(Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<AnalysisReport>>,
}

impl CollectingSink {
    pub fn delivered(&self) -> Vec<AnalysisReport> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl ResultSink for CollectingSink {
    async fn deliver(&self, report: &AnalysisReport) -> Result<(), AppError> {
        self.delivered.lock().push(report.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collecting"
    }
}

pub struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    async fn deliver(&self, _report: &AnalysisReport) -> Result<(), AppError> {
        Err(AppError::ResultHandoff("downstream unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Poll the store until the job reaches a terminal stage
pub async fn wait_for_terminal(store: &ProgressStore, job_id: &str) -> ProgressState {
    loop {
        let state = store.read(job_id);
        if state.is_terminal() {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// In-memory log sink for asserting on emitted events
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route this thread's events at DEBUG and above here until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
