use super::report::AnalysisReport;
use crate::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Downstream consumer of finished analyses
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, report: &AnalysisReport) -> Result<(), AppError>;
    fn name(&self) -> &'static str;
}

/// Writes a summary of each report to the log
pub struct LogResultSink;

#[async_trait]
impl ResultSink for LogResultSink {
    async fn deliver(&self, report: &AnalysisReport) -> Result<(), AppError> {
        info!(
            job_id = %report.job_id,
            run_id = %report.run_id,
            frames = report.frames_analyzed,
            valid_poses = report.valid_poses,
            shots = report.shot_count(),
            "Analysis complete"
        );
        for shot in &report.shots {
            debug!(
                "Shot {} ({:?}): frames {}-{}, peak {:.2} torso/s at {:.2}s",
                shot.index,
                shot.hand,
                shot.start_frame,
                shot.end_frame,
                shot.peak_wrist_speed,
                shot.peak_time
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Persists each report as `<dir>/<encoded job id>.json`
pub struct JsonFileResultSink {
    dir: PathBuf,
}

impl JsonFileResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_job_id(job_id)))
    }
}

#[async_trait]
impl ResultSink for JsonFileResultSink {
    async fn deliver(&self, report: &AnalysisReport) -> Result<(), AppError> {
        let path = self.path_for(&report.job_id);
        let body = serde_json::to_vec_pretty(report)
            .map_err(|e| AppError::ResultHandoff(format!("serialize report: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::ResultHandoff(format!("create {}: {}", self.dir.display(), e))
        })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| AppError::ResultHandoff(format!("write {}: {}", path.display(), e)))?;

        info!("Wrote analysis for job {} to {}", report.job_id, path.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Reversible file-name encoding of a job id.
///
/// ASCII letters, digits and `-` pass through; every other byte, `_` included,
/// becomes `_XX` (uppercase hex). Distinct ids therefore never share a file and
/// nothing can escape the results directory.
fn encode_job_id(job_id: &str) -> String {
    if job_id.is_empty() {
        return "_".to_string();
    }
    let mut encoded = String::with_capacity(job_id.len());
    for byte in job_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{:02X}", byte));
        }
    }
    encoded
}
