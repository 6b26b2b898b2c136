use crate::analysis::{EdgeMap, Frame};
use crate::config::PreprocessConfig;
use crate::error::ImageError;
use image::{imageops, imageops::FilterType, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use std::path::Path;
use tracing::debug;

/// Load a rack photo and turn it into a frame plus edge map.
///
/// Screenshots arrive from different devices, so the photo is first resized
/// to a fixed capture size; the optional crop window then lands on the same
/// pixels regardless of source resolution.
pub fn load_frame(path: &Path, cfg: &PreprocessConfig) -> Result<(Frame, EdgeMap), ImageError> {
    let decoded = image::open(path)
        .map_err(|e| ImageError::Read(path.to_path_buf(), e))?
        .to_rgb8();
    debug!(path = %path.display(), "decoded rack photo");
    Ok(prepare(decoded, cfg))
}

/// Resize, crop, blur, and edge-detect an already decoded photo.
pub fn prepare(image: RgbImage, cfg: &PreprocessConfig) -> (Frame, EdgeMap) {
    let mut image = imageops::resize(
        &image,
        cfg.resize_width,
        cfg.resize_height,
        FilterType::Triangle,
    );

    if let Some((x, y, w, h)) = cfg.crop_window {
        let (width, height) = image.dimensions();
        let w = w.min(width);
        let h = h.min(height);
        // Clamp the window start so the crop never runs off the photo.
        let x = x.min(width - w);
        let y = y.min(height - h);
        image = imageops::crop_imm(&image, x, y, w, h).to_image();
    }

    let gray = imageops::grayscale(&image);
    let blurred = gaussian_blur_f32(&gray, cfg.blur_sigma.max(0.01));
    let edges = canny(&blurred, cfg.canny_low, cfg.canny_high);

    (Frame::new(image), EdgeMap::new(edges))
}
