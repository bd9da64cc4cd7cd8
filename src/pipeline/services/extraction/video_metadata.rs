use crate::error::ExtractionError;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Stream properties needed to plan frame sampling
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub native_fps: f64,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct StreamReport {
    #[serde(default)]
    streams: Vec<StreamEntry>,
    format: Option<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    duration: Option<String>,
}

/// Parse ffprobe rationals such as `30000/1001`, or plain decimals.
/// Returns `None` for `0/0` and other non-positive rates.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_duration(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

impl VideoMetadata {
    /// Build metadata from `ffprobe -of json` output for the first video stream
    pub fn from_ffprobe_json(source: &str, json: &[u8]) -> Result<Self, ExtractionError> {
        let unreadable = |reason: &str| ExtractionError::UnreadableSource {
            source_path: source.to_string(),
            reason: reason.to_string(),
        };

        let output: StreamReport = serde_json::from_slice(json)
            .map_err(|e| unreadable(&format!("malformed ffprobe output: {}", e)))?;
        let stream = output
            .streams
            .first()
            .ok_or_else(|| unreadable("no video stream"))?;

        let native_fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
            .ok_or_else(|| unreadable("unknown frame rate"))?;

        let duration_seconds = parse_duration(stream.duration.as_deref())
            .or_else(|| {
                output
                    .format
                    .as_ref()
                    .and_then(|f| parse_duration(f.duration.as_deref()))
            })
            .ok_or_else(|| unreadable("unknown duration"))?;

        Ok(Self {
            native_fps,
            duration_seconds,
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
        })
    }
}

/// Run ffprobe against `source` and read back its first video stream
pub async fn read_metadata(
    ffprobe: &Path,
    source: &str,
) -> Result<VideoMetadata, ExtractionError> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-select_streams", "v:0"])
        .args([
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,duration:format=duration",
        ])
        .args(["-of", "json"])
        .arg(source)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| ExtractionError::Spawn {
            program: ffprobe.to_path_buf(),
            error,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::UnreadableSource {
            source_path: source.to_string(),
            reason: format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
        });
    }

    VideoMetadata::from_ffprobe_json(source, &output.stdout)
}
