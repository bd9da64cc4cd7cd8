use crate::pipeline::types::ProgressState;
use serde::{Deserialize, Serialize};

/// Body of `POST /detect`. Missing fields read as empty and are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectRequest {
    pub job_id: String,
    pub video_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub job_id: String,
    pub accepted: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub job_id: Option<String>,
}

/// Stored progress plus the derived percentage
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub state: ProgressState,
    pub percent: u8,
}

impl From<ProgressState> for ProgressResponse {
    fn from(state: ProgressState) -> Self {
        let percent = state.percent();
        Self { state, percent }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub model_ready: bool,
}
