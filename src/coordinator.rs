use crate::{
    config::Configuration,
    error::{AppError, ProgressError},
    pipeline::services::{
        extraction::{FrameExtractor, FrameSource},
        managers::ProgressStore,
        orchestration::{
            describe_failure, AnalysisOrchestrator, AnalysisRequest, AnalysisServiceBuilder,
            AnalysisSettings, BoxedAnalysisService,
        },
        pose::SharedPoseEstimator,
        results::{sink_from_config, ResultSink},
    },
    pipeline::types::ProgressState,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tracing::{debug, error, info};

/// Accepts analysis jobs and runs each one as its own task
pub struct JobCoordinator {
    store: ProgressStore,
    service: Mutex<BoxedAnalysisService>,
    estimator: SharedPoseEstimator,
    job_timeout: Option<Duration>,
}

impl JobCoordinator {
    /// Register the job and start it in the background.
    ///
    /// Fails with `AlreadyRunning` while a job with the same id is non-terminal.
    pub fn trigger(&self, job_id: &str, video_url: &str) -> Result<JoinHandle<()>, ProgressError> {
        self.store.begin(job_id)?;
        info!("Accepted job {} for {}", job_id, video_url);

        let service = self.service.lock().clone();
        let store = self.store.clone();
        let job_timeout = self.job_timeout;
        let request = AnalysisRequest::registered(job_id, video_url);

        Ok(tokio::spawn(async move {
            let job_id = request.job_id.clone();
            match service.oneshot(request).await {
                Ok(report) => info!(
                    "Job {} finished with {} shots",
                    job_id,
                    report.shot_count()
                ),
                Err(e) => {
                    let reason = describe_failure(&e, job_timeout);
                    error!("Job {} failed: {}", job_id, reason);
                    // The orchestrator has usually recorded the failure already
                    if let Err(e) = store.fail(&job_id, &reason) {
                        debug!("Job {} not marked failed again: {}", job_id, e);
                    }
                }
            }
        }))
    }

    pub fn progress(&self, job_id: &str) -> ProgressState {
        self.store.read(job_id)
    }

    /// A busy estimator is in use by a job, so it counts as loaded
    pub fn is_model_ready(&self) -> bool {
        self.estimator
            .try_lock()
            .map_or(true, |estimator| estimator.is_initialized())
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    frame_source: Option<Arc<dyn FrameSource>>,
    estimator: Option<SharedPoseEstimator>,
    sink: Option<Arc<dyn ResultSink>>,
    store: Option<ProgressStore>,
    job_timeout: Option<Duration>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        let job_timeout = configuration.analysis.job_timeout();
        Self {
            configuration,
            job_timeout,
            frame_source: None,
            estimator: None,
            sink: None,
            store: None,
        }
    }

    // Sets the job ceiling, this will override the default configuration.
    pub fn job_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    // Adjusts the batch size, this will override the default configuration.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.configuration.analysis.batch_size = batch_size;
        self
    }

    pub fn frame_source(mut self, frame_source: Arc<dyn FrameSource>) -> Self {
        self.frame_source = Some(frame_source);
        self
    }

    pub fn estimator(mut self, estimator: SharedPoseEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn progress_store(mut self, store: ProgressStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<JobCoordinator, AppError> {
        let estimator = self
            .estimator
            .ok_or(AppError::Pipeline("Pose estimator not set".to_string()))?;
        let configuration = self.configuration;
        let frame_source: Arc<dyn FrameSource> = match self.frame_source {
            Some(frame_source) => frame_source,
            None => Arc::new(FrameExtractor::new(&configuration.extraction)),
        };
        let sink = self
            .sink
            .unwrap_or_else(|| sink_from_config(&configuration.results));
        let store = self
            .store
            .unwrap_or_else(|| ProgressStore::new(configuration.progress.max_entries));
        let job_timeout = self.job_timeout;

        let orchestrator = AnalysisOrchestrator::new(
            frame_source,
            estimator.clone(),
            store.clone(),
            sink,
            AnalysisSettings::from(&configuration),
        );
        let service = AnalysisServiceBuilder::new(Arc::new(orchestrator))
            .job_timeout(job_timeout)
            .build();

        Ok(JobCoordinator {
            store,
            service: Mutex::new(service),
            estimator,
            job_timeout,
        })
    }
}
