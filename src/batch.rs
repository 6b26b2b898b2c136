use crate::analysis::{
    build_denoiser, normalize, BandSegmenter, EdgeMap, Frame, RegionLocator, TubeSegments,
};
use crate::config::PipelineConfig;
use crate::error::{ImageError, RackscanError};
use crate::preprocess::load_frame;
use crate::report::BatchReport;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the full pipeline over a batch of rack photos.
///
/// Images are independent up to the normalization barrier, so each one runs
/// on its own blocking task. A failed image is logged and skipped; the
/// barrier proceeds over the tubes that made it through.
pub struct BatchRunner {
    config: Arc<PipelineConfig>,
}

impl BatchRunner {
    /// Build a runner. Configuration problems fail here, before any image is
    /// touched.
    pub fn new(config: PipelineConfig) -> Result<Self, RackscanError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub async fn run(&self, images: Vec<PathBuf>) -> Result<BatchReport, RackscanError> {
        info!(images = images.len(), "starting batch");

        let tasks: Vec<_> = images
            .into_iter()
            .map(|path| {
                let config = Arc::clone(&self.config);
                tokio::task::spawn_blocking(move || process_image(&path, &config))
            })
            .collect();

        // Barrier: every tube's segment list must exist before the batch-wide
        // reference area can be computed.
        let mut tubes: Vec<TubeSegments> = Vec::new();
        for result in join_all(tasks).await {
            match result {
                Ok(Ok(mut image_tubes)) => tubes.append(&mut image_tubes),
                Ok(Err(e)) => warn!("skipping image: {e}"),
                Err(e) => warn!("skipping image, worker failed: {e}"),
            }
        }

        let normalized = normalize(&tubes)?;
        info!(
            tubes = normalized.tubes.len(),
            reference_area = normalized.reference_area,
            "batch normalized"
        );
        Ok(BatchReport::from_normalized(&normalized))
    }
}

/// Process a single photo: preprocess, locate tube regions, segment each
/// crop. Pure with respect to the batch; no shared mutable state.
pub fn process_image(
    path: &Path,
    config: &PipelineConfig,
) -> Result<Vec<TubeSegments>, ImageError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ImageError::MissingStem(path.to_path_buf()))?
        .to_string();

    let (frame, edges) = load_frame(path, &config.preprocess)?;
    Ok(process_frame(&stem, &frame, &edges, config))
}

/// The in-memory half of per-image processing, shared by the runner and by
/// callers that preprocess frames themselves.
pub fn process_frame(
    stem: &str,
    frame: &Frame,
    edges: &EdgeMap,
    config: &PipelineConfig,
) -> Vec<TubeSegments> {
    let locator = RegionLocator::new(config.min_region_height);
    let regions = locator.locate(edges);
    if regions.is_empty() {
        // Valid outcome, not a failure: the photo simply has no tubes.
        info!(image = %stem, "no tubes detected");
        return Vec::new();
    }

    let denoiser = build_denoiser(&config.denoise);
    let segmenter = BandSegmenter::new(config);

    regions
        .iter()
        .enumerate()
        .map(|(index, region)| {
            let crop = frame.tube_crop(region, config.crop_inset_x, config.crop_inset_y);
            let crop = denoiser.denoise(&crop);
            segmenter.segment(&format!("{stem}_tube{index}"), &crop)
        })
        .collect()
}
