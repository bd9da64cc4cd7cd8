use super::pose_model::PoseModel;
use super::preprocess::{letterbox, LetterboxInfo};
use crate::common::Frame;
use crate::config::PoseConfig;
use crate::error::PoseError;
use crate::pipeline::types::{Keypoint, KeypointName, Pose, KEYPOINT_COUNT};
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

/// 4 box values, 1 person score, then (x, y, confidence) per keypoint
const CHANNELS: usize = 5 + KEYPOINT_COUNT * 3;

/// YOLO pose export running on ONNX Runtime
pub struct YoloPoseModel {
    config: PoseConfig,
    session: Option<Session>,
}

impl YoloPoseModel {
    pub fn new(config: PoseConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }
}

impl PoseModel for YoloPoseModel {
    fn initialize(&mut self) -> Result<(), PoseError> {
        if self.session.is_some() {
            return Ok(());
        }

        let path = &self.config.model_path;
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(self.config.intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| PoseError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        info!("Loaded pose model from {}", path.display());
        self.session = Some(session);
        Ok(())
    }

    fn infer(&mut self, frame: &Frame) -> Result<Option<Pose>, PoseError> {
        let session = self.session.as_mut().ok_or(PoseError::NotInitialized)?;

        let (input, letterbox_info) = letterbox(frame.image(), self.config.input_size)?;
        let input_tensor =
            Tensor::from_array(input).map_err(|e| PoseError::Inference(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![self.config.input_name.as_str() => input_tensor])
            .map_err(|e| PoseError::Inference(e.to_string()))?;

        let output: ArrayViewD<f32> = outputs[self.config.output_name.as_str()]
            .try_extract_array()
            .map_err(|e| PoseError::Inference(e.to_string()))?;

        decode_best_candidate(
            &output,
            &letterbox_info,
            self.config.detection_threshold,
            frame,
        )
    }

    fn name(&self) -> &'static str {
        "yolo_pose"
    }
}

/// Pick the highest-scoring person in a `[1, 56, N]` output and map it to frame pixels
pub fn decode_best_candidate(
    output: &ArrayViewD<f32>,
    letterbox: &LetterboxInfo,
    threshold: f32,
    frame: &Frame,
) -> Result<Option<Pose>, PoseError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] != CHANNELS {
        return Err(PoseError::OutputShape {
            expected: format!("[1, {}, N]", CHANNELS),
            got: format!("{:?}", shape),
        });
    }

    let mut best: Option<(usize, f32)> = None;
    for i in 0..shape[2] {
        let score = output[[0, 4, i]];
        if score >= threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    let Some((idx, score)) = best else {
        return Ok(None);
    };

    let keypoints = KeypointName::ALL
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let base = 5 + k * 3;
            let (x, y) = letterbox.to_frame(output[[0, base, idx]], output[[0, base + 1, idx]]);
            let confidence = output[[0, base + 2, idx]].clamp(0.0, 1.0);
            Keypoint::new(name.as_str(), x, y, confidence)
        })
        .collect();

    Ok(Some(Pose {
        frame_number: frame.frame_number(),
        timestamp_seconds: frame.timestamp_seconds(),
        keypoints,
        overall_score: score.clamp(0.0, 1.0),
    }))
}
