use std::path::PathBuf;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum RackscanError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Image Error: {0}")]
    Image(#[from] ImageError),
    #[error("Normalization Error: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("Report Error: {0}")]
    Report(#[from] serde_json::Error),
}

// Configuration errors are surfaced before any image is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Palette must contain at least one color")]
    EmptyPalette,
    #[error("Palette color '{0}' has no tolerance entry")]
    MissingTolerance(String),
    #[error("Palette color '{label}' has {channel} = {value} outside its valid range")]
    ChannelOutOfRange {
        label: String,
        channel: &'static str,
        value: f32,
    },
    #[error("Tolerance for '{label}' has negative {channel}")]
    NegativeTolerance {
        label: String,
        channel: &'static str,
    },
    #[error("'{0}' must be greater than zero")]
    ZeroParameter(&'static str),
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image {0}: {1}")]
    Read(PathBuf, image::ImageError),
    #[error("Failed to write report {0}: {1}")]
    WriteReport(PathBuf, std::io::Error),
    #[error("Image {0} has no file stem")]
    MissingStem(PathBuf),
}

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("No reference area available: the batch contains no qualifying segments")]
    NoReferenceArea,
}
