use crate::pipeline::types::Stage;
use indexmap::IndexMap;
use std::time::Duration;

/// Tracks timing information for job stages and batch steps
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    /// Total duration per stage
    stage_durations: IndexMap<Stage, Duration>,
    /// Duration per step, summed over every batch
    step_durations: IndexMap<String, Duration>,
    /// Number of batches each step ran on
    step_calls: IndexMap<String, u32>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate time spent in a stage
    pub fn record_stage(&mut self, stage: Stage, duration: Duration) {
        *self.stage_durations.entry(stage).or_default() += duration;
    }

    /// Accumulate time spent in one run of a step
    pub fn record_step(&mut self, step_name: &str, duration: Duration) {
        *self
            .step_durations
            .entry(step_name.to_string())
            .or_default() += duration;
        *self.step_calls.entry(step_name.to_string()).or_default() += 1;
    }

    pub fn stage_duration(&self, stage: Stage) -> Duration {
        self.stage_durations.get(&stage).copied().unwrap_or_default()
    }

    pub fn step_duration(&self, step_name: &str) -> Duration {
        self.step_durations
            .get(step_name)
            .copied()
            .unwrap_or_default()
    }

    pub fn step_calls(&self, step_name: &str) -> u32 {
        self.step_calls.get(step_name).copied().unwrap_or(0)
    }

    /// Stages then steps, in the order they were first recorded, in milliseconds
    pub fn as_millis(&self) -> IndexMap<String, f64> {
        self.stage_durations
            .iter()
            .map(|(stage, d)| (stage.name().to_string(), d.as_secs_f64() * 1000.0))
            .chain(
                self.step_durations
                    .iter()
                    .map(|(step, d)| (step.clone(), d.as_secs_f64() * 1000.0)),
            )
            .collect()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        self.as_millis()
            .iter()
            .map(|(name, ms)| format!("{}={:.1}ms", name, ms))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
