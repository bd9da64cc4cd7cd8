use super::analysis_orchestrator::{AnalysisOrchestrator, AnalysisRequest};
use crate::error::AppError;
use crate::pipeline::services::results::AnalysisReport;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{Service, ServiceBuilder};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-erased analysis service as handed to the coordinator
pub type BoxedAnalysisService = BoxCloneService<AnalysisRequest, AnalysisReport, BoxError>;

/// tower adapter over the orchestrator
#[derive(Clone)]
pub struct AnalysisService {
    inner: Arc<AnalysisOrchestrator>,
}

impl AnalysisService {
    pub fn new(inner: Arc<AnalysisOrchestrator>) -> Self {
        Self { inner }
    }
}

impl Service<AnalysisRequest> for AnalysisService {
    type Response = AnalysisReport;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: AnalysisRequest) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { inner.run(req).await.map_err(BoxError::from) })
    }
}

pub struct AnalysisServiceBuilder {
    orchestrator: Arc<AnalysisOrchestrator>,
    job_timeout: Option<Duration>,
}

impl AnalysisServiceBuilder {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self {
            orchestrator,
            job_timeout: None,
        }
    }

    /// Wall-clock ceiling for a whole job
    pub fn job_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    pub fn build(self) -> BoxedAnalysisService {
        let service = ServiceBuilder::new()
            .option_layer(self.job_timeout.map(TimeoutLayer::new))
            .service(AnalysisService::new(self.orchestrator));
        BoxCloneService::new(service)
    }
}

/// Human-readable failure reason for a service error, naming the ceiling on timeouts
pub fn describe_failure(error: &BoxError, job_timeout: Option<Duration>) -> String {
    if error.is::<Elapsed>() {
        match job_timeout {
            Some(limit) => AppError::Timeout(limit).to_string(),
            None => error.to_string(),
        }
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProgressError;
    use crate::pipeline::services::managers::ProgressStore;
    use crate::pipeline::services::orchestration::AnalysisSettings;
    use crate::pipeline::services::pose::PoseEstimator;
    use crate::pipeline::types::Stage;
    use crate::pipeline::services::extraction::FrameSource;
    use crate::testing::{
        blank_frames, CollectingSink, ScriptedPoseModel, ScriptedResult, SlowFrameSource,
        StaticFrameSource,
    };
    use tower::ServiceExt;

    fn orchestrator(store: ProgressStore, slow: bool) -> Arc<AnalysisOrchestrator> {
        let frames = blank_frames(3, 10.0);
        let source: Arc<dyn FrameSource> = if slow {
            Arc::new(SlowFrameSource::new(frames, Duration::from_secs(5)))
        } else {
            Arc::new(StaticFrameSource::new(frames))
        };
        Arc::new(AnalysisOrchestrator::new(
            source,
            PoseEstimator::new(Box::new(ScriptedPoseModel::new(vec![ScriptedResult::Standing; 3])))
                .into_shared(),
            store,
            Arc::new(CollectingSink::default()),
            AnalysisSettings::default(),
        ))
    }

    #[tokio::test]
    async fn runs_the_orchestrator() {
        let store = ProgressStore::new(4);
        let service = AnalysisServiceBuilder::new(orchestrator(store.clone(), false))
            .job_timeout(Some(Duration::from_secs(30)))
            .build();

        let report = service
            .oneshot(AnalysisRequest::new("job", "clip.mp4"))
            .await
            .expect("report");

        assert_eq!(report.frames_analyzed, 3);
        assert_eq!(store.read("job").stage, Stage::Completed);
    }

    #[tokio::test]
    async fn slow_jobs_hit_the_ceiling() {
        let store = ProgressStore::new(4);
        let limit = Some(Duration::from_millis(100));
        let service = AnalysisServiceBuilder::new(orchestrator(store.clone(), true))
            .job_timeout(limit)
            .build();

        let err = service
            .oneshot(AnalysisRequest::new("slow", "clip.mp4"))
            .await
            .expect_err("timeout");

        assert!(err.is::<Elapsed>());
        assert!(describe_failure(&err, limit).contains("wall-clock"));
        // The orchestrator was dropped mid-extraction, so the stored stage is unchanged
        assert_eq!(store.read("slow").stage, Stage::Extracting);
    }

    #[tokio::test]
    async fn second_direct_call_for_a_running_job_is_turned_away() {
        let store = ProgressStore::new(4);
        let service = AnalysisServiceBuilder::new(orchestrator(store.clone(), true)).build();

        let first = tokio::spawn(
            service
                .clone()
                .oneshot(AnalysisRequest::new("twice", "clip.mp4")),
        );
        while !store.is_running("twice") {
            tokio::task::yield_now().await;
        }

        let err = service
            .oneshot(AnalysisRequest::new("twice", "clip.mp4"))
            .await
            .expect_err("duplicate run");
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Progress(ProgressError::AlreadyRunning(_)))
        ));
        assert!(store.is_running("twice"));
        assert!(store.read("twice").error.is_none());
        first.abort();
    }

    #[test]
    fn other_errors_are_described_verbatim() {
        let err: BoxError = Box::new(AppError::Pipeline("boom".to_string()));
        assert_eq!(describe_failure(&err, None), "Pipeline error: boom");
    }
}
