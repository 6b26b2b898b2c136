pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod preprocess;
pub mod report;

pub use analysis::{
    normalize, BandSegmenter, EdgeMap, Frame, RegionLocator, TubeRegion, TubeSegments,
};
pub use batch::{process_frame, process_image, BatchRunner};
pub use config::{DenoiseMode, PaletteEntry, PipelineConfig, Tolerance};
pub use error::{ConfigError, ImageError, NormalizeError, RackscanError};
pub use report::{BatchReport, TubeReport};
