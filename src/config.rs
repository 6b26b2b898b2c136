use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A reference color the classifier matches rows against.
///
/// Hue is in degrees `[0, 360)`, saturation and value in percent `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl PaletteEntry {
    pub const fn new(hue: f32, saturation: f32, value: f32) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }
}

/// Per-color matching window half-widths, same units as [`PaletteEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Tolerance {
    pub const fn new(hue: f32, saturation: f32, value: f32) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }
}

/// Optional denoising stage applied to each tube crop before segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DenoiseMode {
    Off,
    Kmeans { clusters: usize },
}

impl Default for DenoiseMode {
    fn default() -> Self {
        DenoiseMode::Off
    }
}

/// Parameters for turning a decoded photo into a frame plus edge map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Photos are resized to this fixed capture size before anything else,
    /// so crop windows behave the same across source devices.
    pub resize_width: u32,
    pub resize_height: u32,
    /// Optional crop window applied after the resize: (x, y, width, height).
    pub crop_window: Option<(u32, u32, u32, u32)>,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            resize_width: 540,
            resize_height: 1200,
            crop_window: None,
            blur_sigma: 1.0,
            canny_low: 180.0,
            canny_high: 400.0,
        }
    }
}

/// Configuration for the rack analysis pipeline with tunable parameters.
///
/// Loaded once at startup, validated, then read-only for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Named reference colors, in discovery order. Order matters: it breaks
    /// ties when two colors score the same match count for a row.
    pub palette: IndexMap<String, PaletteEntry>,
    /// Matching window per palette label. Every palette label must have one.
    pub tolerances: IndexMap<String, Tolerance>,
    /// Contour bounding boxes at or below this height are discarded as noise.
    pub min_region_height: u32,
    /// Height of one row analysis unit. Larger steps trade resolution for
    /// noise robustness.
    pub row_step: u32,
    /// A row unit whose best match count falls below this is background.
    pub min_row_pixels: u32,
    /// Minimum row extent for a surviving segment.
    pub min_segment_height: u32,
    /// Horizontal inset applied to each tube crop, skipping tube walls.
    pub crop_inset_x: u32,
    /// Vertical inset applied to each tube crop, skipping caps and glare.
    pub crop_inset_y: u32,
    pub preprocess: PreprocessConfig,
    pub denoise: DenoiseMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            tolerances: default_tolerances(),
            min_region_height: 100,
            row_step: 2,
            min_row_pixels: 12,
            min_segment_height: 20,
            crop_inset_x: 15,
            crop_inset_y: 3,
            preprocess: PreprocessConfig::default(),
            denoise: DenoiseMode::default(),
        }
    }
}

/// Reference colors measured from the puzzle-game capture set.
fn default_palette() -> IndexMap<String, PaletteEntry> {
    IndexMap::from([
        ("red".to_string(), PaletteEntry::new(359.2, 62.6, 89.0)),
        ("tan".to_string(), PaletteEntry::new(32.7, 35.6, 87.1)),
        ("rose".to_string(), PaletteEntry::new(359.3, 35.3, 98.8)),
        ("purple".to_string(), PaletteEntry::new(257.9, 57.9, 79.2)),
        ("blue".to_string(), PaletteEntry::new(219.9, 76.2, 98.0)),
        ("white".to_string(), PaletteEntry::new(180.0, 3.7, 94.1)),
        ("orange".to_string(), PaletteEntry::new(32.2, 87.7, 99.2)),
        ("cyan".to_string(), PaletteEntry::new(189.5, 85.5, 81.2)),
        ("lime".to_string(), PaletteEntry::new(119.1, 63.4, 79.2)),
    ])
}

fn default_tolerances() -> IndexMap<String, Tolerance> {
    IndexMap::from([
        ("red".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
        ("tan".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
        ("rose".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
        ("purple".to_string(), Tolerance::new(8.0, 16.0, 16.0)),
        ("blue".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
        ("white".to_string(), Tolerance::new(10.0, 12.0, 12.0)),
        ("orange".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
        ("cyan".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
        ("lime".to_string(), Tolerance::new(10.0, 16.0, 16.0)),
    ])
}

impl PipelineConfig {
    /// Load a configuration file (JSON/TOML/YAML per extension), falling back
    /// to defaults for any field the file omits.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let cfg: PipelineConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration parameters. Must pass before any image is
    /// processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }

        for (label, entry) in &self.palette {
            if !self.tolerances.contains_key(label) {
                return Err(ConfigError::MissingTolerance(label.clone()));
            }
            check_channel(label, "hue", entry.hue, 360.0)?;
            check_channel(label, "saturation", entry.saturation, 100.0)?;
            check_channel(label, "value", entry.value, 100.0)?;
        }

        for (label, tol) in &self.tolerances {
            for (channel, v) in [
                ("hue", tol.hue),
                ("saturation", tol.saturation),
                ("value", tol.value),
            ] {
                if v < 0.0 || !v.is_finite() {
                    return Err(ConfigError::NegativeTolerance {
                        label: label.clone(),
                        channel,
                    });
                }
            }
        }

        if self.row_step == 0 {
            return Err(ConfigError::ZeroParameter("row_step"));
        }
        if self.min_row_pixels == 0 {
            return Err(ConfigError::ZeroParameter("min_row_pixels"));
        }
        if self.min_segment_height == 0 {
            return Err(ConfigError::ZeroParameter("min_segment_height"));
        }
        if let DenoiseMode::Kmeans { clusters } = self.denoise {
            if clusters == 0 {
                return Err(ConfigError::ZeroParameter("denoise.clusters"));
            }
        }

        Ok(())
    }

    /// Set the minimum region height for tube detection.
    pub fn with_min_region_height(mut self, height: u32) -> Self {
        self.min_region_height = height;
        self
    }

    /// Set the row analysis step.
    pub fn with_row_step(mut self, step: u32) -> Self {
        self.row_step = step.max(1);
        self
    }

    /// Replace the palette and tolerances wholesale.
    pub fn with_palette(
        mut self,
        palette: IndexMap<String, PaletteEntry>,
        tolerances: IndexMap<String, Tolerance>,
    ) -> Self {
        self.palette = palette;
        self.tolerances = tolerances;
        self
    }

    /// Set the denoising stage.
    pub fn with_denoise(mut self, mode: DenoiseMode) -> Self {
        self.denoise = mode;
        self
    }
}

fn check_channel(
    label: &str,
    channel: &'static str,
    value: f32,
    max: f32,
) -> Result<(), ConfigError> {
    // Hue is half-open, saturation and value are closed ranges; a palette
    // entry sitting exactly on 360 is a wrap mistake either way.
    if !value.is_finite() || value < 0.0 || value > max || (channel == "hue" && value >= max) {
        return Err(ConfigError::ChannelOutOfRange {
            label: label.to_string(),
            channel,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn palette_label_without_tolerance_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.palette
            .insert("magenta".to_string(), PaletteEntry::new(300.0, 80.0, 90.0));
        match cfg.validate() {
            Err(ConfigError::MissingTolerance(label)) => assert_eq!(label, "magenta"),
            other => panic!("expected MissingTolerance, got {:?}", other),
        }
    }

    #[test]
    fn empty_palette_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.palette.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyPalette)));
    }

    #[test]
    fn hue_at_wrap_boundary_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.palette
            .insert("bad".to_string(), PaletteEntry::new(360.0, 50.0, 50.0));
        cfg.tolerances
            .insert("bad".to_string(), Tolerance::new(10.0, 16.0, 16.0));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ChannelOutOfRange { channel: "hue", .. })
        ));
    }

    #[test]
    fn zero_row_step_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.row_step = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroParameter("row_step"))
        ));
    }

    #[test]
    fn builders_clamp_and_assign() {
        let cfg = PipelineConfig::default()
            .with_row_step(0)
            .with_min_region_height(64);
        assert_eq!(cfg.row_step, 1);
        assert_eq!(cfg.min_region_height, 64);
    }
}
