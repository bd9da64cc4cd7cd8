use crate::error::PoseError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// Gray padding in normalized range
const PAD_VALUE: f32 = 114.0 / 255.0;

/// How a frame was fitted into the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl LetterboxInfo {
    /// Map a point in model input space back to frame pixels
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox `image` into a `[1, 3, size, size]` tensor with values in [0.0, 1.0]
pub fn letterbox(image: &RgbImage, size: u32) -> Result<(Array4<f32>, LetterboxInfo), PoseError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || size == 0 {
        return Err(PoseError::Inference(format!(
            "cannot letterbox a {}x{} frame into {}",
            w, h, size
        )));
    }

    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let s = size as usize;
    let mut tensor = Array4::<f32>::from_elem((1, 3, s, s), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let dst_x = (x + pad_x) as usize;
        let dst_y = (y + pad_y) as usize;
        for c in 0..3 {
            tensor[[0, c, dst_y, dst_x]] = pixel[c] as f32 / 255.0;
        }
    }

    Ok((
        tensor,
        LetterboxInfo {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    ))
}
