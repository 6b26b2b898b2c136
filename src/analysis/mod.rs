pub mod context;
pub mod denoise;
pub mod locator;
pub mod mask;
pub mod normalize;
pub mod segmenter;

pub use context::{EdgeMap, Frame, TubeRegion};
pub use denoise::{build_denoiser, Denoise, KmeansPosterizer, Passthrough};
pub use locator::RegionLocator;
pub use mask::{ColorWindow, HsvBuffer, HsvPixel};
pub use normalize::{normalize, NormalizedBand, NormalizedBatch, TubeBands};
pub use segmenter::{BandSegmenter, GapSegment, Segment, TubeSegments};
