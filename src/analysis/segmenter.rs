use super::mask::{ColorWindow, CompiledColor, HsvBuffer};
use crate::config::PipelineConfig;
use image::RgbImage;
use tracing::debug;

/// A maximal run of rows classified as one palette color, after merging and
/// short-segment filtering. Rows are half-open: `[start_row, end_row)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub label: String,
    pub start_row: u32,
    pub end_row: u32,
    /// Count of pixels inside the row range matching this segment's own
    /// color window, not the raw box area; a crop can contain background
    /// pixels inside the bounding box.
    pub pixel_area: u64,
}

impl Segment {
    pub fn extent(&self) -> u32 {
        self.end_row - self.start_row
    }
}

/// A background run retained for empty-capacity estimation. Never part of the
/// ordered band list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapSegment {
    pub start_row: u32,
    pub end_row: u32,
    pub pixel_area: u64,
}

/// One tube's segmentation output, ready for cross-batch normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeSegments {
    pub tube_id: String,
    pub segments: Vec<Segment>,
    pub gaps: Vec<GapSegment>,
}

/// Classification of one row analysis unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowClass {
    /// Index into the compiled palette.
    Color(usize),
    /// No color's match count cleared the floor; empty tube space.
    Background,
}

/// Splits a tube crop into an ordered list of color bands.
pub struct BandSegmenter {
    colors: Vec<CompiledColor>,
    row_step: u32,
    min_row_pixels: u64,
    min_segment_height: u32,
}

impl BandSegmenter {
    pub fn new(config: &PipelineConfig) -> Self {
        let colors = config
            .palette
            .iter()
            .map(|(label, entry)| CompiledColor {
                label: label.clone(),
                // validate() guarantees the tolerance entry exists.
                window: ColorWindow::new(entry, &config.tolerances[label]),
            })
            .collect();

        Self {
            colors,
            row_step: config.row_step.max(1),
            min_row_pixels: config.min_row_pixels as u64,
            min_segment_height: config.min_segment_height,
        }
    }

    /// Segment one tube crop. Deterministic for a fixed configuration: the
    /// same crop always yields the same segment list.
    ///
    /// An all-background crop is a valid empty tube, not an error; a crop
    /// that classifies uniformly produces a single segment spanning it.
    pub fn segment(&self, tube_id: &str, crop: &RgbImage) -> TubeSegments {
        let hsv = HsvBuffer::from_rgb(crop);

        let classes = self.classify_rows(&hsv);
        let candidates = collapse_runs(&classes);
        let merged = merge_adjacent(candidates);

        let mut segments = Vec::new();
        let mut gaps = Vec::new();
        for run in merged {
            match run.class {
                RowClass::Color(idx) => {
                    if run.end - run.start < self.min_segment_height {
                        // Boundary noise between two real bands.
                        continue;
                    }
                    let color = &self.colors[idx];
                    segments.push(Segment {
                        label: color.label.clone(),
                        start_row: run.start,
                        end_row: run.end,
                        pixel_area: hsv.count_matches(run.start..run.end, &color.window),
                    });
                }
                RowClass::Background => {
                    gaps.push(GapSegment {
                        start_row: run.start,
                        end_row: run.end,
                        pixel_area: (run.end - run.start) as u64 * hsv.width() as u64,
                    });
                }
            }
        }

        debug!(
            tube_id,
            segments = segments.len(),
            gaps = gaps.len(),
            "segmented tube crop"
        );

        TubeSegments {
            tube_id: tube_id.to_string(),
            segments,
            gaps,
        }
    }

    /// Classify each row unit as its best-matching color or background.
    fn classify_rows(&self, hsv: &HsvBuffer) -> Vec<(RowClass, u32, u32)> {
        let height = hsv.height();
        let mut classes = Vec::new();

        let mut start = 0u32;
        while start < height {
            let end = (start + self.row_step).min(height);

            let mut best: Option<(usize, u64)> = None;
            for (idx, color) in self.colors.iter().enumerate() {
                let count = hsv.count_matches(start..end, &color.window);
                // Strictly-greater keeps the first palette entry on ties, so
                // palette order decides and reruns stay identical.
                if best.map_or(count > 0, |(_, c)| count > c) {
                    best = Some((idx, count));
                }
            }

            let class = match best {
                Some((idx, count)) if count >= self.min_row_pixels => RowClass::Color(idx),
                _ => RowClass::Background,
            };
            classes.push((class, start, end));
            start = end;
        }

        classes
    }
}

struct Run {
    class: RowClass,
    start: u32,
    end: u32,
}

/// Collapse consecutive units with the same classification into runs with
/// real row boundaries.
fn collapse_runs(classes: &[(RowClass, u32, u32)]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &(class, start, end) in classes {
        match runs.last_mut() {
            Some(last) if last.class == class && last.end == start => last.end = end,
            _ => runs.push(Run { class, start, end }),
        }
    }
    runs
}

/// Defensive re-merge of touching same-class runs left behind by row-step
/// quantization.
fn merge_adjacent(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::new();
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.class == run.class && last.end == run.start => {
                last.end = run.end;
            }
            _ => merged.push(run),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PaletteEntry, PipelineConfig, Tolerance};
    use image::Rgb;
    use indexmap::IndexMap;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn test_config() -> PipelineConfig {
        let palette = IndexMap::from([
            ("red".to_string(), PaletteEntry::new(0.0, 100.0, 100.0)),
            ("blue".to_string(), PaletteEntry::new(240.0, 100.0, 100.0)),
        ]);
        let tolerances = IndexMap::from([
            ("red".to_string(), Tolerance::new(10.0, 20.0, 20.0)),
            ("blue".to_string(), Tolerance::new(10.0, 20.0, 20.0)),
        ]);
        let mut cfg = PipelineConfig::default().with_palette(palette, tolerances);
        cfg.row_step = 5;
        cfg.min_row_pixels = 10;
        cfg.min_segment_height = 10;
        cfg
    }

    fn banded_crop(bands: &[(Rgb<u8>, u32)]) -> RgbImage {
        let height: u32 = bands.iter().map(|(_, h)| h).sum();
        let mut rows = Vec::new();
        for (color, h) in bands {
            for _ in 0..*h {
                rows.push(*color);
            }
        }
        RgbImage::from_fn(40, height, |_, y| rows[y as usize])
    }

    #[test]
    fn two_bands_produce_two_ordered_segments() {
        let crop = banded_crop(&[(RED, 30), (BLUE, 30)]);
        let segmenter = BandSegmenter::new(&test_config());

        let result = segmenter.segment("t0", &crop);
        assert_eq!(result.segments.len(), 2);

        let red = &result.segments[0];
        assert_eq!(red.label, "red");
        assert_eq!((red.start_row, red.end_row), (0, 30));
        assert_eq!(red.pixel_area, 30 * 40);

        let blue = &result.segments[1];
        assert_eq!(blue.label, "blue");
        assert_eq!((blue.start_row, blue.end_row), (30, 60));

        // Ordered and non-overlapping.
        assert!(result
            .segments
            .windows(2)
            .all(|w| w[0].end_row <= w[1].start_row && w[0].start_row < w[1].start_row));
    }

    #[test]
    fn uniform_crop_yields_one_full_height_segment() {
        let crop = banded_crop(&[(RED, 55)]);
        let segmenter = BandSegmenter::new(&test_config());

        let result = segmenter.segment("t0", &crop);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].start_row, 0);
        assert_eq!(result.segments[0].end_row, 55);
    }

    #[test]
    fn all_background_crop_is_a_valid_empty_tube() {
        let crop = banded_crop(&[(BLACK, 60)]);
        let segmenter = BandSegmenter::new(&test_config());

        let result = segmenter.segment("t0", &crop);
        assert!(result.segments.is_empty());
        assert_eq!(result.gaps.len(), 1);
        assert_eq!(result.gaps[0].pixel_area, 60 * 40);
    }

    #[test]
    fn short_bands_are_dropped_as_boundary_noise() {
        let crop = banded_crop(&[(RED, 30), (BLUE, 5), (RED, 30)]);
        let segmenter = BandSegmenter::new(&test_config());

        let result = segmenter.segment("t0", &crop);
        let labels: Vec<_> = result.segments.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["red", "red"]);
    }

    #[test]
    fn gap_between_bands_is_recorded_not_emitted() {
        let crop = banded_crop(&[(RED, 30), (BLACK, 20), (BLUE, 30)]);
        let segmenter = BandSegmenter::new(&test_config());

        let result = segmenter.segment("t0", &crop);
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.gaps.len(), 1);
        assert_eq!((result.gaps[0].start_row, result.gaps[0].end_row), (30, 50));
    }

    #[test]
    fn segmentation_is_deterministic() {
        let crop = banded_crop(&[(RED, 25), (BLACK, 15), (BLUE, 40)]);
        let segmenter = BandSegmenter::new(&test_config());

        let first = segmenter.segment("t0", &crop);
        let second = segmenter.segment("t0", &crop);
        assert_eq!(first, second);
    }

    #[test]
    fn pixel_area_excludes_non_matching_pixels_in_range() {
        // Red band with a black column down the middle: the box covers it,
        // the mask count must not.
        let mut crop = banded_crop(&[(RED, 40)]);
        for y in 0..40 {
            for x in 18..22 {
                crop.put_pixel(x, y, BLACK);
            }
        }
        let segmenter = BandSegmenter::new(&test_config());

        let result = segmenter.segment("t0", &crop);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].pixel_area, 40 * (40 - 4));
    }
}
