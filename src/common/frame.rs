use image::RgbImage;
use std::sync::Arc;

/// A decoded, sampled video frame.
///
/// `frame_number` is 1-based and strictly increasing within one extraction.
#[derive(Clone)]
pub struct Frame {
    frame_number: u32,
    timestamp_seconds: f64,
    image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(frame_number: u32, timestamp_seconds: f64, image: RgbImage) -> Self {
        Self {
            frame_number,
            timestamp_seconds,
            image: Arc::new(image),
        }
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp_seconds
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB8 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Observes whether any clone of this frame still holds its pixels
    #[cfg(test)]
    pub(crate) fn image_watch(&self) -> std::sync::Weak<RgbImage> {
        Arc::downgrade(&self.image)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("frame_number", &self.frame_number)
            .field("timestamp_seconds", &self.timestamp_seconds)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
