use super::batch_context::{BatchContext, JobAccumulator};
use super::instrumented_step::StepInstrumentation;
use super::processing_step::BatchPipeline;
use super::progress_tracker::ProgressTracker;
use crate::config::{Configuration, ShotConfig};
use crate::error::AppError;
use crate::pipeline::services::biomechanics::{ShotAggregator, ShotDetector};
use crate::pipeline::services::extraction::FrameSource;
use crate::pipeline::services::managers::ProgressStore;
use crate::pipeline::services::pose::SharedPoseEstimator;
use crate::pipeline::services::results::{AnalysisReport, ResultSink};
use crate::pipeline::services::steps::{
    AngleCalculationStep, PoseDetectionStep, ShotSegmentationStep,
};
use crate::pipeline::types::Stage;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// A request to analyze one uploaded video
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub job_id: String,
    pub video_url: String,
    /// The job is already in the progress store and this run drives it
    pub registered: bool,
}

impl AnalysisRequest {
    /// A run that registers the job itself
    pub fn new(job_id: impl Into<String>, video_url: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            video_url: video_url.into(),
            registered: false,
        }
    }

    /// A run for a job the caller has just registered with `ProgressStore::begin`
    pub fn registered(job_id: impl Into<String>, video_url: impl Into<String>) -> Self {
        Self {
            registered: true,
            ..Self::new(job_id, video_url)
        }
    }
}

/// Tuning knobs for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub target_fps: f64,
    pub batch_size: usize,
    pub min_pose_score: f32,
    pub shots: ShotConfig,
}

impl From<&Configuration> for AnalysisSettings {
    fn from(configuration: &Configuration) -> Self {
        Self {
            target_fps: configuration.extraction.target_fps,
            batch_size: configuration.analysis.batch_size,
            min_pose_score: configuration.pose.min_pose_score,
            shots: configuration.shots.clone(),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from(&Configuration::default())
    }
}

/// Drives one job through extracting, analyzing and processing to completed.
///
/// Any error moves the job to `failed` with the error's message.
pub struct AnalysisOrchestrator {
    frame_source: Arc<dyn FrameSource>,
    estimator: SharedPoseEstimator,
    progress: ProgressStore,
    sink: Arc<dyn ResultSink>,
    settings: AnalysisSettings,
}

impl AnalysisOrchestrator {
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        estimator: SharedPoseEstimator,
        progress: ProgressStore,
        sink: Arc<dyn ResultSink>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            frame_source,
            estimator,
            progress,
            sink,
            settings,
        }
    }

    #[cfg(test)]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisReport, AppError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", job_id = %request.job_id, %run_id);

        async move {
            // Another run owns this job id, so its progress is left alone
            let mut tracker = if request.registered {
                ProgressTracker::resume_registered(self.progress.clone(), &request.job_id)?
            } else {
                ProgressTracker::begin(self.progress.clone(), &request.job_id)?
            };
            match self.execute(&request, run_id, &mut tracker).await {
                Ok(report) => Ok(report),
                Err(e) => {
                    tracing::error!("Analysis failed: {}", e);
                    tracker.fail(&e.to_string());
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request: &AnalysisRequest,
        run_id: Uuid,
        tracker: &mut ProgressTracker,
    ) -> Result<AnalysisReport, AppError> {
        let mut acc = JobAccumulator::new(ShotDetector::new(self.settings.shots.clone()));

        // Extracting
        let stage_start = Instant::now();
        self.ensure_model_ready().await?;
        let mut batches = self
            .frame_source
            .open(&request.video_url, self.settings.target_fps)
            .await?;
        acc.timings.record_stage(Stage::Extracting, stage_start.elapsed());

        let batch_size = self.settings.batch_size.max(1);
        let total_frames = batches.total_frames();
        let total_batches = (total_frames as usize).div_ceil(batch_size) as u32;
        tracker.update(|state| {
            state.total_frames = total_frames;
            state.total_batches = total_batches;
            state.message = format!("Extracted {} frames", total_frames);
        })?;

        // Analyzing
        let stage_start = Instant::now();
        tracker.enter(Stage::Analyzing, "Analyzing poses")?;
        let mut pipeline = self.build_pipeline();
        // Only the batch in flight is decoded
        let mut batch_index = 0u32;
        while let Some(chunk) = batches.next_batch(batch_size).await? {
            batch_index += 1;
            let batch = BatchContext::new(request.job_id.clone(), batch_index, chunk);
            pipeline.process(batch, &mut acc).await?;

            let (frames_done, shots) = (acc.frames_processed, acc.segments.len() as u32);
            tracker.update(|state| {
                state.current_batch = batch_index;
                state.current_frame = frames_done;
                state.shots_detected = shots;
                state.message = format!("Analyzed batch {} of {}", batch_index, total_batches);
            })?;
        }
        acc.timings.record_stage(Stage::Analyzing, stage_start.elapsed());

        // Processing
        let stage_start = Instant::now();
        tracker.enter(Stage::Processing, "Summarizing shots")?;
        if let Some(segment) = acc.shot_detector.finish() {
            acc.segments.push(segment);
        }
        let segments = std::mem::take(&mut acc.segments);
        let shots = ShotAggregator::new(self.settings.shots.merge_gap_seconds)
            .aggregate(segments, &acc.analyzed_poses);
        let shot_count = shots.len() as u32;
        tracker.update(|state| state.shots_detected = shot_count)?;

        acc.timings.record_stage(Stage::Processing, stage_start.elapsed());
        let report = AnalysisReport {
            job_id: request.job_id.clone(),
            run_id: run_id.to_string(),
            video_url: request.video_url.clone(),
            total_frames,
            frames_analyzed: acc.frames_processed,
            poses_detected: acc.poses_detected,
            valid_poses: acc.valid_poses,
            shots,
            poses: std::mem::take(&mut acc.analyzed_poses),
            timings_ms: acc.timings.as_millis(),
            completed_at: Utc::now(),
        };
        self.sink.deliver(&report).await?;

        tracker.enter(
            Stage::Completed,
            format!("Detected {} shots in {} frames", shot_count, total_frames),
        )?;
        info!(
            "Job finished via {} sink: {} frames, {} valid poses ({} rejected), {} shots [{}]",
            self.sink.name(),
            total_frames,
            acc.valid_poses,
            acc.invalid_poses,
            shot_count,
            acc.timings.summary()
        );
        Ok(report)
    }

    fn build_pipeline(&self) -> BatchPipeline {
        BatchPipeline::new()
            .add_step(Box::new(
                PoseDetectionStep::new(self.estimator.clone()).instrumented(),
            ))
            .add_step(Box::new(
                AngleCalculationStep::new(self.settings.min_pose_score).instrumented(),
            ))
            .add_step(Box::new(ShotSegmentationStep::new().instrumented()))
    }

    async fn ensure_model_ready(&self) -> Result<(), AppError> {
        let estimator = self.estimator.clone();
        tokio::task::spawn_blocking(move || estimator.lock().initialize())
            .await
            .map_err(|e| AppError::Pipeline(format!("Model initialization task failed: {}", e)))??;
        Ok(())
    }
}
