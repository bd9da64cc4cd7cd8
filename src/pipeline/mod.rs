pub mod services;
pub mod types;

pub use services::orchestration::{AnalysisOrchestrator, AnalysisRequest, AnalysisSettings};
pub use services::results::AnalysisReport;
pub use types::{AnalyzedPose, BodyAngles, Pose, ProgressState, Shot, Stage};
