pub mod frame_extractor;
pub mod video_metadata;

pub use frame_extractor::{
    BufferedFrames, DecodedFrameBatches, FrameBatches, FrameExtractor, FrameSource, SamplingPlan,
};
pub use video_metadata::VideoMetadata;
