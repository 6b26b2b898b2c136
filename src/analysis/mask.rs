use crate::config::{PaletteEntry, Tolerance};
use image::RgbImage;
use palette::{FromColor, Hsv, Srgb};
use std::ops::Range;

/// One pixel in HSV: hue in degrees `[0, 360)`, saturation and value in
/// percent `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvPixel {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl HsvPixel {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        let hsv = Hsv::from_color(srgb);
        Self {
            hue: hsv.hue.into_positive_degrees(),
            saturation: hsv.saturation * 100.0,
            value: hsv.value * 100.0,
        }
    }
}

/// A tube crop converted to HSV once, so every palette color can be tested
/// against the same buffer.
pub struct HsvBuffer {
    width: u32,
    height: u32,
    pixels: Vec<HsvPixel>,
}

impl HsvBuffer {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image
            .pixels()
            .map(|p| HsvPixel::from_rgb(p[0], p[1], p[2]))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row(&self, y: u32) -> &[HsvPixel] {
        let start = (y * self.width) as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Count pixels in `rows` that fall inside `window`.
    pub fn count_matches(&self, rows: Range<u32>, window: &ColorWindow) -> u64 {
        rows.map(|y| {
            self.row(y)
                .iter()
                .filter(|px| window.contains(px))
                .count() as u64
        })
        .sum()
    }
}

/// Tolerance window around one reference color.
///
/// Hue is circular: a window that crosses 0/360 splits into two sub-ranges,
/// one anchored at each end of the axis, and a pixel matches if it falls in
/// either. A naive single-range test would silently drop red-family matches
/// near the wrap boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorWindow {
    hue_ranges: [(f32, f32); 2],
    saturation: (f32, f32),
    value: (f32, f32),
}

impl ColorWindow {
    pub fn new(entry: &PaletteEntry, tol: &Tolerance) -> Self {
        let lo = entry.hue - tol.hue;
        let hi = entry.hue + tol.hue;

        let hue_ranges = if lo < 0.0 {
            [(0.0, hi), (360.0 + lo, 360.0)]
        } else if hi >= 360.0 {
            [(lo, 360.0), (0.0, hi - 360.0)]
        } else {
            [(lo, hi), (lo, hi)]
        };

        Self {
            hue_ranges,
            saturation: clamped_range(entry.saturation, tol.saturation),
            value: clamped_range(entry.value, tol.value),
        }
    }

    pub fn contains(&self, px: &HsvPixel) -> bool {
        let in_hue = self
            .hue_ranges
            .iter()
            .any(|&(lo, hi)| px.hue >= lo && px.hue <= hi);
        in_hue
            && px.saturation >= self.saturation.0
            && px.saturation <= self.saturation.1
            && px.value >= self.value.0
            && px.value <= self.value.1
    }
}

fn clamped_range(center: f32, tol: f32) -> (f32, f32) {
    ((center - tol).max(0.0), (center + tol).min(100.0))
}

/// A palette color compiled into its matching window.
#[derive(Debug, Clone)]
pub struct CompiledColor {
    pub label: String,
    pub window: ColorWindow,
}
