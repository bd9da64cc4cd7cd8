pub mod analysis_orchestrator;
pub mod analysis_service;
pub mod batch_context;
pub mod instrumented_step;
pub mod processing_step;
pub mod progress_tracker;
pub mod stage_timings;

pub use analysis_orchestrator::{AnalysisOrchestrator, AnalysisRequest, AnalysisSettings};
pub use analysis_service::{
    describe_failure, AnalysisService, AnalysisServiceBuilder, BoxError, BoxedAnalysisService,
};
pub use batch_context::{BatchContext, JobAccumulator};
pub use instrumented_step::{InstrumentedStep, StepInstrumentation};
pub use processing_step::{BatchPipeline, BatchStep};
pub use progress_tracker::ProgressTracker;
pub use stage_timings::StageTimings;
