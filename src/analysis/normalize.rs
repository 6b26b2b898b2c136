use super::segmenter::TubeSegments;
use crate::error::NormalizeError;
use tracing::{debug, info};

/// A segment re-expressed as an integer number of liquid units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBand {
    pub label: String,
    pub units: u32,
    /// Pixel area attributed to a single unit of this band.
    pub unit_area: u64,
}

/// One tube's normalized band sequence, label order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeBands {
    pub tube_id: String,
    pub bands: Vec<NormalizedBand>,
    /// Units of visible empty space, estimated from background gaps.
    pub empty_units: u32,
}

/// The whole batch after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBatch {
    /// The smallest segment area observed anywhere in the batch; the working
    /// definition of one liquid unit.
    pub reference_area: u64,
    pub tubes: Vec<TubeBands>,
}

/// Normalize every tube's segments against a batch-wide reference area.
///
/// This is a strict barrier: it needs every tube's segment list at once,
/// because the reference is the minimum `pixel_area` across the entire batch.
/// The smallest observed band is assumed to hold exactly one unit, so a band
/// several units tall with no visible internal edge gets split arithmetically:
/// `units = max(1, round(area / reference))`, rounding to the nearest integer
/// (a 1.5 ratio becomes 2 units). An empty batch has no meaningful unit size
/// and fails hard instead of guessing.
pub fn normalize(tubes: &[TubeSegments]) -> Result<NormalizedBatch, NormalizeError> {
    let reference_area = tubes
        .iter()
        .flat_map(|t| t.segments.iter())
        .map(|s| s.pixel_area)
        .filter(|&a| a > 0)
        .min()
        .ok_or(NormalizeError::NoReferenceArea)?;

    info!(reference_area, tubes = tubes.len(), "normalizing batch");

    let tubes = tubes
        .iter()
        .map(|tube| {
            let bands = tube
                .segments
                .iter()
                .map(|s| {
                    let units = unit_count(s.pixel_area, reference_area);
                    NormalizedBand {
                        label: s.label.clone(),
                        units,
                        unit_area: s.pixel_area / units as u64,
                    }
                })
                .collect();

            let empty_units = empty_capacity(tube, reference_area);
            debug!(tube_id = %tube.tube_id, empty_units, "normalized tube");

            TubeBands {
                tube_id: tube.tube_id.clone(),
                bands,
                empty_units,
            }
        })
        .collect();

    Ok(NormalizedBatch {
        reference_area,
        tubes,
    })
}

fn unit_count(pixel_area: u64, reference_area: u64) -> u32 {
    let ratio = pixel_area as f64 / reference_area as f64;
    (ratio.round() as u32).max(1)
}

/// Units of empty space a tube's background gaps could hold. Gaps smaller
/// than half a unit are treated as boundary slack, not capacity.
fn empty_capacity(tube: &TubeSegments, reference_area: u64) -> u32 {
    tube.gaps
        .iter()
        .filter(|g| 2 * g.pixel_area >= reference_area)
        .map(|g| unit_count(g.pixel_area, reference_area))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::segmenter::{GapSegment, Segment};

    fn seg(label: &str, start: u32, end: u32, area: u64) -> Segment {
        Segment {
            label: label.to_string(),
            start_row: start,
            end_row: end,
            pixel_area: area,
        }
    }

    fn tube(id: &str, segments: Vec<Segment>) -> TubeSegments {
        TubeSegments {
            tube_id: id.to_string(),
            segments,
            gaps: Vec::new(),
        }
    }

    #[test]
    fn wide_bands_split_against_the_batch_minimum() {
        let tubes = vec![
            tube("a", vec![seg("red", 0, 20, 100)]),
            tube(
                "b",
                vec![seg("blue", 0, 20, 100), seg("red", 20, 80, 310)],
            ),
        ];

        let batch = normalize(&tubes).unwrap();
        assert_eq!(batch.reference_area, 100);

        let a = &batch.tubes[0];
        assert_eq!(a.bands.len(), 1);
        assert_eq!((a.bands[0].label.as_str(), a.bands[0].units), ("red", 1));

        let b = &batch.tubes[1];
        assert_eq!((b.bands[0].label.as_str(), b.bands[0].units), ("blue", 1));
        // 310 / 100 rounds to 3 synthetic units.
        assert_eq!((b.bands[1].label.as_str(), b.bands[1].units), ("red", 3));
        assert_eq!(b.bands[1].unit_area, 310 / 3);
    }

    #[test]
    fn every_band_gets_at_least_one_unit() {
        // An area below half the reference still reports as one unit.
        let tubes = vec![tube("a", vec![seg("red", 0, 20, 100), seg("blue", 25, 40, 30)])];
        let batch = normalize(&tubes).unwrap();
        assert!(batch.tubes[0].bands.iter().all(|b| b.units >= 1));
    }

    #[test]
    fn half_ratio_rounds_up() {
        let tubes = vec![
            tube("a", vec![seg("red", 0, 10, 100)]),
            tube("b", vec![seg("red", 0, 15, 150)]),
        ];
        let batch = normalize(&tubes).unwrap();
        assert_eq!(batch.tubes[1].bands[0].units, 2);
    }

    #[test]
    fn empty_tube_keeps_an_empty_band_list() {
        let tubes = vec![tube("a", vec![seg("red", 0, 20, 100)]), tube("b", vec![])];
        let batch = normalize(&tubes).unwrap();
        assert!(batch.tubes[1].bands.is_empty());
    }

    #[test]
    fn empty_batch_fails_with_no_reference_area() {
        let tubes = vec![tube("a", vec![]), tube("b", vec![])];
        assert!(matches!(
            normalize(&tubes),
            Err(NormalizeError::NoReferenceArea)
        ));
    }

    #[test]
    fn zero_tubes_fails_with_no_reference_area() {
        assert!(matches!(
            normalize(&[]),
            Err(NormalizeError::NoReferenceArea)
        ));
    }

    #[test]
    fn gaps_estimate_empty_capacity() {
        let mut t = tube("a", vec![seg("red", 0, 20, 100)]);
        t.gaps = vec![
            GapSegment {
                start_row: 20,
                end_row: 60,
                pixel_area: 210,
            },
            // Below half a unit: boundary slack, ignored.
            GapSegment {
                start_row: 60,
                end_row: 64,
                pixel_area: 30,
            },
        ];

        let batch = normalize(&[t]).unwrap();
        assert_eq!(batch.tubes[0].empty_units, 2);
    }
}
