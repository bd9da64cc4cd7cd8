use crate::error::ProgressError;
use crate::pipeline::types::{ProgressState, Stage};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Process-wide job progress, keyed by job id.
///
/// Cloning is cheap and every clone sees the same map. Locks are only held
/// for the duration of a single map operation.
#[derive(Clone)]
pub struct ProgressStore {
    entries: Arc<RwLock<HashMap<String, ProgressState>>>,
    max_entries: usize,
}

impl ProgressStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Register a new run of `job_id`, rejecting it while a previous run is still active
    pub fn begin(&self, job_id: &str) -> Result<ProgressState, ProgressError> {
        let mut entries = self.entries.write();
        match entries.get(job_id) {
            Some(existing) if !existing.is_terminal() => {
                return Err(ProgressError::AlreadyRunning(job_id.to_string()));
            }
            Some(_) => {}
            None => {
                if entries.len() >= self.max_entries {
                    Self::evict_oldest_terminal(&mut entries);
                }
            }
        }

        let state = ProgressState::started();
        entries.insert(job_id.to_string(), state.clone());
        Ok(state)
    }

    /// Hand a freshly registered job to the run that will drive it.
    ///
    /// Only an untouched `begin` state can be resumed, so a second writer is turned away.
    pub fn resume(&self, job_id: &str) -> Result<ProgressState, ProgressError> {
        let entries = self.entries.read();
        let state = entries
            .get(job_id)
            .ok_or_else(|| ProgressError::UnknownJob(job_id.to_string()))?;
        if state.is_terminal() {
            return Err(ProgressError::Terminal {
                job_id: job_id.to_string(),
                stage: state.stage,
            });
        }
        if !state.is_fresh() {
            return Err(ProgressError::AlreadyRunning(job_id.to_string()));
        }
        Ok(state.clone())
    }

    /// Replace the stored state after checking the lifecycle rules
    pub fn publish(&self, job_id: &str, mut state: ProgressState) -> Result<(), ProgressError> {
        let mut entries = self.entries.write();
        let current_stage = {
            let current = entries.get(job_id);
            let sentinel = ProgressState::not_started();
            let current = current.unwrap_or(&sentinel);
            validate_transition(job_id, current, &state)?;
            current.stage
        };

        if current_stage != state.stage {
            debug!("Job {} moved {} -> {}", job_id, current_stage, state.stage);
        }
        state.touch();
        entries.insert(job_id.to_string(), state);
        Ok(())
    }

    /// Last published state, or the `not_started` sentinel for unknown ids
    pub fn read(&self, job_id: &str) -> ProgressState {
        self.entries
            .read()
            .get(job_id)
            .cloned()
            .unwrap_or_else(ProgressState::not_started)
    }

    /// Move a running job to `failed`
    pub fn fail(&self, job_id: &str, error: &str) -> Result<ProgressState, ProgressError> {
        let mut entries = self.entries.write();
        let state = entries
            .get_mut(job_id)
            .ok_or_else(|| ProgressError::UnknownJob(job_id.to_string()))?;
        if state.is_terminal() {
            return Err(ProgressError::Terminal {
                job_id: job_id.to_string(),
                stage: state.stage,
            });
        }
        state.fail(error);
        Ok(state.clone())
    }

    #[cfg(test)]
    pub fn is_running(&self, job_id: &str) -> bool {
        self.entries
            .read()
            .get(job_id)
            .is_some_and(|state| !state.is_terminal())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_oldest_terminal(entries: &mut HashMap<String, ProgressState>) {
        let oldest = entries
            .iter()
            .filter(|(_, state)| state.is_terminal())
            .min_by_key(|(_, state)| state.updated_at)
            .map(|(job_id, _)| job_id.clone());

        match oldest {
            Some(job_id) => {
                debug!("Evicting progress for finished job {}", job_id);
                entries.remove(&job_id);
            }
            None => warn!(
                "Progress store is full of running jobs ({}), growing past capacity",
                entries.len()
            ),
        }
    }
}

fn validate_transition(
    job_id: &str,
    current: &ProgressState,
    next: &ProgressState,
) -> Result<(), ProgressError> {
    if current.is_terminal() {
        return Err(ProgressError::Terminal {
            job_id: job_id.to_string(),
            stage: current.stage,
        });
    }
    if next.stage == Stage::NotStarted || !current.stage.can_transition_to(next.stage) {
        return Err(ProgressError::InvalidTransition {
            job_id: job_id.to_string(),
            from: current.stage,
            to: next.stage,
        });
    }
    if next.stage == current.stage
        && (next.current_frame < current.current_frame
            || next.current_batch < current.current_batch)
    {
        return Err(ProgressError::CounterRegression(job_id.to_string()));
    }
    Ok(())
}
