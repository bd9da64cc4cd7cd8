use super::video_metadata::{self, VideoMetadata};
use crate::common::Frame;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

const FRAME_PATTERN: &str = "frame_%06d.png";

/// Sampled frames handed out in order, a bounded batch at a time
#[async_trait]
pub trait FrameBatches: Send {
    /// Frames the source sampled. Frames that fail to decode are skipped, so fewer may arrive.
    fn total_frames(&self) -> u32;

    /// The next non-empty run of at most `max_frames` frames, or `None` once exhausted
    async fn next_batch(&mut self, max_frames: usize)
        -> Result<Option<Vec<Frame>>, ExtractionError>;
}

/// Anything that can turn a video reference into an ordered sequence of frames
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&self, source: &str, target_fps: f64)
        -> Result<Box<dyn FrameBatches>, ExtractionError>;

    /// Every frame at once. Prefer `open` for long videos.
    async fn extract_frames(
        &self,
        source: &str,
        target_fps: f64,
    ) -> Result<Vec<Frame>, ExtractionError> {
        let mut batches = self.open(source, target_fps).await?;
        let mut frames = Vec::with_capacity(batches.total_frames() as usize);
        while let Some(batch) = batches.next_batch(usize::MAX).await? {
            frames.extend(batch);
        }
        Ok(frames)
    }
}

/// Frames already in memory
pub struct BufferedFrames {
    frames: std::vec::IntoIter<Frame>,
    total: u32,
}

impl BufferedFrames {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            total: frames.len() as u32,
            frames: frames.into_iter(),
        }
    }
}

#[async_trait]
impl FrameBatches for BufferedFrames {
    fn total_frames(&self) -> u32 {
        self.total
    }

    async fn next_batch(
        &mut self,
        max_frames: usize,
    ) -> Result<Option<Vec<Frame>>, ExtractionError> {
        let batch: Vec<Frame> = self.frames.by_ref().take(max_frames.max(1)).collect();
        Ok((!batch.is_empty()).then_some(batch))
    }
}

/// Sampled images waiting on disk. Only the requested batch is decoded;
/// the scratch directory lives as long as this value.
pub struct DecodedFrameBatches {
    source: String,
    plan: SamplingPlan,
    pending: VecDeque<(u32, PathBuf)>,
    total: u32,
    delivered: u32,
    _scratch: TempDir,
}

impl DecodedFrameBatches {
    fn new(source: &str, plan: SamplingPlan, paths: Vec<PathBuf>, scratch: TempDir) -> Self {
        let pending: VecDeque<(u32, PathBuf)> = paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| (index as u32 + 1, path))
            .collect();
        Self {
            source: source.to_string(),
            plan,
            total: pending.len() as u32,
            pending,
            delivered: 0,
            _scratch: scratch,
        }
    }
}

#[async_trait]
impl FrameBatches for DecodedFrameBatches {
    fn total_frames(&self) -> u32 {
        self.total
    }

    async fn next_batch(
        &mut self,
        max_frames: usize,
    ) -> Result<Option<Vec<Frame>>, ExtractionError> {
        while !self.pending.is_empty() {
            let take = max_frames.max(1).min(self.pending.len());
            let chunk: Vec<(u32, PathBuf)> = self.pending.drain(..take).collect();
            let plan = self.plan;
            let frames = tokio::task::spawn_blocking(move || decode_frames(chunk, &plan))
                .await
                .map_err(|e| ExtractionError::DecodeTask(e.to_string()))?;
            if !frames.is_empty() {
                self.delivered += frames.len() as u32;
                return Ok(Some(frames));
            }
        }
        if self.delivered == 0 {
            return Err(ExtractionError::NoFrames(self.source.clone()));
        }
        Ok(None)
    }
}

/// Which native frames to keep when sampling at `target_fps`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPlan {
    pub native_fps: f64,
    /// Keep every `stride`-th native frame
    pub stride: u32,
    /// Upper bound on frames produced
    pub expected_frames: u32,
}

impl SamplingPlan {
    pub fn new(native_fps: f64, duration_seconds: f64, target_fps: f64) -> Self {
        let stride = (native_fps / target_fps).round().max(1.0) as u32;
        let expected_frames = ((duration_seconds * target_fps).floor() as u32).max(1);
        Self {
            native_fps,
            stride,
            expected_frames,
        }
    }

    /// Presentation time of the sampled frame numbered `frame_number` (1-based)
    pub fn timestamp_for(&self, frame_number: u32) -> f64 {
        frame_number.saturating_sub(1) as f64 * self.stride as f64 / self.native_fps
    }
}

/// ffmpeg-backed frame sampler
pub struct FrameExtractor {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl FrameExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    async fn ensure_readable(&self, source: &str) -> Result<(), ExtractionError> {
        if source.contains("://") {
            return Ok(());
        }
        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(ExtractionError::UnreadableSource {
                source_path: source.to_string(),
                reason: "not a regular file".to_string(),
            }),
            Err(e) => Err(ExtractionError::UnreadableSource {
                source_path: source.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn scratch(&self) -> Result<tempfile::TempDir, ExtractionError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("swing-frames-");
            builder
        };
        let dir = match &self.scratch_dir {
            Some(root) => {
                tokio::fs::create_dir_all(root)
                    .await
                    .map_err(ExtractionError::Scratch)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        dir.map_err(ExtractionError::Scratch)
    }

    async fn run_ffmpeg(
        &self,
        source: &str,
        plan: &SamplingPlan,
        output_dir: &Path,
    ) -> Result<(), ExtractionError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(ffmpeg_args(source, plan, output_dir))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| ExtractionError::Spawn {
                program: self.ffmpeg_path.clone(),
                error,
            })?;

        // A truncated file makes ffmpeg exit non-zero after writing a usable prefix
        if !output.status.success() {
            warn!(
                "ffmpeg exited with {} for {}: {}",
                output.status,
                source,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FrameExtractor {
    #[instrument(skip(self))]
    async fn open(
        &self,
        source: &str,
        target_fps: f64,
    ) -> Result<Box<dyn FrameBatches>, ExtractionError> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(ExtractionError::InvalidTargetFps(target_fps));
        }
        self.ensure_readable(source).await?;

        let metadata: VideoMetadata =
            video_metadata::read_metadata(&self.ffprobe_path, source).await?;
        let plan = SamplingPlan::new(metadata.native_fps, metadata.duration_seconds, target_fps);
        debug!(
            "Sampling {} ({}x{}, {:.2} fps, {:.2}s) with stride {} up to {} frames",
            source,
            metadata.width,
            metadata.height,
            metadata.native_fps,
            metadata.duration_seconds,
            plan.stride,
            plan.expected_frames
        );

        // Dropping the TempDir removes whatever is left on every exit path
        let scratch = self.scratch().await?;
        self.run_ffmpeg(source, &plan, scratch.path()).await?;

        let paths = collect_frame_files(scratch.path()).await?;
        if paths.is_empty() {
            return Err(ExtractionError::NoFrames(source.to_string()));
        }
        info!("Sampled {} frames from {}", paths.len(), source);
        Ok(Box::new(DecodedFrameBatches::new(source, plan, paths, scratch)))
    }
}

/// ffmpeg arguments that keep every `stride`-th native frame, capped at the expected count
fn ffmpeg_args(source: &str, plan: &SamplingPlan, output_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-y", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(source.into());
    args.push("-vf".into());
    args.push(format!("select=not(mod(n\\,{}))", plan.stride).into());
    args.extend(["-vsync", "vfr", "-frames:v"].map(OsString::from));
    args.push(plan.expected_frames.to_string().into());
    args.push(output_dir.join(FRAME_PATTERN).into_os_string());
    args
}

async fn collect_frame_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(ExtractionError::Scratch)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ExtractionError::Scratch)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("png") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Decode numbered images in order. Each file is removed as soon as it has been read.
fn decode_frames(paths: Vec<(u32, PathBuf)>, plan: &SamplingPlan) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(paths.len());
    for (frame_number, path) in paths {
        let decoded = image::open(&path).map(|image| image.to_rgb8());
        if let Err(e) = std::fs::remove_file(&path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
        match decoded {
            Ok(image) => frames.push(Frame::new(
                frame_number,
                plan.timestamp_for(frame_number),
                image,
            )),
            Err(e) => warn!("Skipping frame {}: {}", frame_number, e),
        }
    }
    frames
}
