use rackscan::{BatchRunner, PipelineConfig, RackscanError};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    images
}

#[tokio::main]
async fn main() -> Result<(), RackscanError> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let input_dir = PathBuf::from(args.next().unwrap_or_else(|| "assets".to_string()));
    let config = match args.next() {
        Some(path) => PipelineConfig::from_file(Path::new(&path))?,
        None => PipelineConfig::default(),
    };

    let images = collect_images(&input_dir);
    info!(dir = %input_dir.display(), images = images.len(), "scanning rack photos");

    let runner = BatchRunner::new(config)?;
    let report = runner.run(images).await?;

    let out_path = input_dir.join("batch_report.json");
    report.write_json(&out_path)?;
    info!(report = %out_path.display(), tubes = report.tubes.len(), "wrote batch report");

    Ok(())
}
