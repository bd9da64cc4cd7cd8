use super::batch_context::{BatchContext, JobAccumulator};
use crate::error::AppError;
use async_trait::async_trait;

/// Chain of Responsibility pattern for batch processing
#[async_trait]
pub trait BatchStep: Send + Sync {
    async fn process(
        &mut self,
        batch: &mut BatchContext,
        acc: &mut JobAccumulator,
    ) -> Result<(), AppError>;
    fn name(&self) -> &'static str;
}

/// Runs each batch through an ordered chain of steps
pub struct BatchPipeline {
    steps: Vec<Box<dyn BatchStep>>,
}

impl BatchPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: Box<dyn BatchStep>) -> Self {
        self.steps.push(step);
        self
    }

    #[cfg(test)]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub async fn process(
        &mut self,
        mut batch: BatchContext,
        acc: &mut JobAccumulator,
    ) -> Result<BatchContext, AppError> {
        for step in &mut self.steps {
            tracing::trace!("Batch {}: {}", batch.batch_index, step.name());
            step.process(&mut batch, acc).await?;
        }
        Ok(batch)
    }
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self::new()
    }
}
