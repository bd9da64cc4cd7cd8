use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse phase of an analysis job.
///
/// Implements Ord based on priority so stage regressions can be detected by comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Sentinel returned for ids the store has never seen; never stored
    #[serde(rename = "not_started")]
    NotStarted,
    /// Probing the source and sampling frames
    Extracting,
    /// Running pose estimation, angle calculation and shot segmentation batch by batch
    Analyzing,
    /// Merging and summarising detected shots
    Processing,
    Completed,
    Failed,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::NotStarted => "not_started",
            Stage::Extracting => "extracting",
            Stage::Analyzing => "analyzing",
            Stage::Processing => "processing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }

    /// Execution order (lower happens first)
    pub fn priority(&self) -> u8 {
        match self {
            Stage::NotStarted => 0,
            Stage::Extracting => 1,
            Stage::Analyzing => 2,
            Stage::Processing => 3,
            Stage::Completed => 4,
            Stage::Failed => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    /// The only stage a running job may move to next, besides `Failed`
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::NotStarted => Some(Stage::Extracting),
            Stage::Extracting => Some(Stage::Analyzing),
            Stage::Analyzing => Some(Stage::Processing),
            Stage::Processing => Some(Stage::Completed),
            Stage::Completed | Stage::Failed => None,
        }
    }

    /// Staying put (counter updates), moving to the direct successor, or failing
    pub fn can_transition_to(&self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == *self || next == Stage::Failed || self.successor() == Some(next)
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Last known state of one analysis job, as surfaced to polling clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub stage: Stage,
    pub current_frame: u32,
    pub total_frames: u32,
    pub current_batch: u32,
    pub total_batches: u32,
    pub shots_detected: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressState {
    /// Fresh state for a job that was just triggered
    pub fn started() -> Self {
        Self::with_stage(Stage::Extracting, "Extracting frames from video")
    }

    pub fn not_started() -> Self {
        Self::with_stage(Stage::NotStarted, "Analysis has not been started")
    }

    fn with_stage(stage: Stage, message: &str) -> Self {
        Self {
            stage,
            current_frame: 0,
            total_frames: 0,
            current_batch: 0,
            total_batches: 0,
            shots_detected: 0,
            message: message.to_string(),
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Registered but untouched: still extracting, no counters, no error
    pub fn is_fresh(&self) -> bool {
        self.stage == Stage::Extracting
            && self.error.is_none()
            && self.total_frames == 0
            && self.current_frame == 0
            && self.total_batches == 0
            && self.current_batch == 0
    }

    pub fn enter(&mut self, stage: Stage, message: impl Into<String>) {
        self.stage = stage;
        self.message = message.into();
        self.touch();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.stage = Stage::Failed;
        self.message = format!("Analysis failed: {}", error);
        self.error = Some(error);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// UI-facing completion percentage, derived from stage and batch counters
    pub fn percent(&self) -> u8 {
        match self.stage {
            Stage::NotStarted => 0,
            Stage::Extracting => {
                if self.total_frames > 0 {
                    30
                } else {
                    0
                }
            }
            Stage::Analyzing => self.analyzing_percent(),
            Stage::Processing => 95,
            Stage::Completed => 100,
            Stage::Failed => {
                if self.total_batches > 0 {
                    self.analyzing_percent()
                } else {
                    0
                }
            }
        }
    }

    fn analyzing_percent(&self) -> u8 {
        let fraction = if self.total_batches == 0 {
            0.0
        } else {
            (self.current_batch as f64 / self.total_batches as f64).min(1.0)
        };
        ((30.0 + 70.0 * fraction).floor() as u8).min(95)
    }
}
