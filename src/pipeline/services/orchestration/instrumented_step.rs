use super::batch_context::{BatchContext, JobAccumulator};
use super::processing_step::BatchStep;
use crate::error::AppError;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, instrument};

/// Wraps a BatchStep and records its duration into the job's timings
pub struct InstrumentedStep<S> {
    inner: S,
}

impl<S> InstrumentedStep<S> {
    pub fn new(step: S) -> Self {
        Self { inner: step }
    }
}

#[async_trait]
impl<S> BatchStep for InstrumentedStep<S>
where
    S: BatchStep,
{
    #[instrument(
        skip_all,
        fields(job = %batch.job_id, step = self.inner.name(), batch = batch.batch_index)
    )]
    async fn process(
        &mut self,
        batch: &mut BatchContext,
        acc: &mut JobAccumulator,
    ) -> Result<(), AppError> {
        let start = Instant::now();
        let result = self.inner.process(batch, acc).await;
        let duration = start.elapsed();
        acc.timings.record_step(self.inner.name(), duration);

        match &result {
            Ok(_) => debug!(
                "Step '{}' finished in {}us",
                self.inner.name(),
                duration.as_micros()
            ),
            Err(e) => tracing::error!(
                "Step '{}' failed after {}us: {}",
                self.inner.name(),
                duration.as_micros(),
                e
            ),
        }

        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Extension trait to easily wrap steps with instrumentation
pub trait StepInstrumentation: Sized {
    fn instrumented(self) -> InstrumentedStep<Self>;
}

impl<S> StepInstrumentation for S
where
    S: BatchStep,
{
    fn instrumented(self) -> InstrumentedStep<Self> {
        InstrumentedStep::new(self)
    }
}
