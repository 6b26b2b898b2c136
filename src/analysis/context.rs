use image::{imageops, GrayImage, RgbImage};

/// A decoded, preprocessed rack photo. Immutable once built.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Cut one tube's interior out of the frame. The insets shrink the
    /// bounding box so tube walls and cap glare stay out of the strip; if a
    /// region is too small for the insets it is cropped without them.
    pub fn tube_crop(&self, region: &TubeRegion, inset_x: u32, inset_y: u32) -> RgbImage {
        let (inset_x, inset_y) = if region.width > 2 * inset_x && region.height > 2 * inset_y {
            (inset_x, inset_y)
        } else {
            (0, 0)
        };

        let x = region.x + inset_x;
        let y = region.y + inset_y;
        let width = region.width - 2 * inset_x;
        let height = region.height - 2 * inset_y;

        imageops::crop_imm(&self.image, x, y, width, height).to_image()
    }
}

/// Binary mask marking likely object boundaries, same extent as its frame.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    mask: GrayImage,
}

impl EdgeMap {
    pub fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }
}

/// One tube candidate's bounding box in frame coordinates.
///
/// A region's only identity is its position in the left-to-right ordering
/// produced by the locator; overlapping false positives are a known
/// limitation, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TubeRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TubeRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
