use crate::error::ProgressError;
use crate::pipeline::services::managers::ProgressStore;
use crate::pipeline::types::{ProgressState, Stage};
use tracing::warn;

/// A job's private view of its progress; every change is published to the store
pub struct ProgressTracker {
    store: ProgressStore,
    job_id: String,
    state: ProgressState,
}

impl ProgressTracker {
    /// Register a new run of `job_id`; fails while another run is active
    pub fn begin(store: ProgressStore, job_id: &str) -> Result<Self, ProgressError> {
        let state = store.begin(job_id)?;
        Ok(Self::new(store, job_id, state))
    }

    /// Take over a job someone else registered and nobody has driven yet
    pub fn resume_registered(store: ProgressStore, job_id: &str) -> Result<Self, ProgressError> {
        let state = store.resume(job_id)?;
        Ok(Self::new(store, job_id, state))
    }

    fn new(store: ProgressStore, job_id: &str, state: ProgressState) -> Self {
        Self {
            store,
            job_id: job_id.to_string(),
            state,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Apply `change` to the counters and publish the result
    pub fn update(&mut self, change: impl FnOnce(&mut ProgressState)) -> Result<(), ProgressError> {
        let mut next = self.state.clone();
        change(&mut next);
        self.store.publish(&self.job_id, next.clone())?;
        self.state = next;
        Ok(())
    }

    pub fn enter(&mut self, stage: Stage, message: impl Into<String>) -> Result<(), ProgressError> {
        let message = message.into();
        self.update(|state| state.enter(stage, message))
    }

    /// Best effort: a job that is already terminal stays as it is
    pub fn fail(&mut self, error: &str) {
        if let Err(e) = self.update(|state| state.fail(error)) {
            warn!("Could not mark job {} failed: {}", self.job_id, e);
        }
    }
}
