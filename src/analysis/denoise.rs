use crate::config::DenoiseMode;
use image::{Rgb, RgbImage};
use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A crop-level denoising stage run ahead of segmentation.
///
/// Interchangeable by design: the segmenter never knows whether its input was
/// posterized, so strategies can be swapped or omitted without touching the
/// classification code.
pub trait Denoise: Send + Sync {
    fn denoise(&self, image: &RgbImage) -> RgbImage;
}

/// Default stage: hands the crop through untouched.
pub struct Passthrough;

impl Denoise for Passthrough {
    fn denoise(&self, image: &RgbImage) -> RgbImage {
        image.clone()
    }
}

/// Posterizes a crop by clustering its pixels into `clusters` Lab-space
/// centroids and repainting each pixel with its centroid color. Collapses
/// gradients and glare into flat bands before classification.
pub struct KmeansPosterizer {
    clusters: usize,
    max_iterations: usize,
    seed: u64,
}

impl KmeansPosterizer {
    pub fn new(clusters: usize) -> Self {
        Self {
            clusters: clusters.max(1),
            max_iterations: 20,
            seed: 0x5eed,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

pub fn build_denoiser(mode: &DenoiseMode) -> Box<dyn Denoise> {
    match mode {
        DenoiseMode::Off => Box::new(Passthrough),
        DenoiseMode::Kmeans { clusters } => Box::new(KmeansPosterizer::new(*clusters)),
    }
}

impl Denoise for KmeansPosterizer {
    fn denoise(&self, image: &RgbImage) -> RgbImage {
        let samples: Vec<Lab> = image.pixels().map(|p| rgb_to_lab(p)).collect();
        if samples.is_empty() {
            return image.clone();
        }

        let k = self.clusters.min(samples.len());
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Seed centroids from random pixels; a fixed RNG seed keeps the
        // stage deterministic run to run.
        let mut centroids: Vec<Lab> = (0..k)
            .map(|_| samples[rng.random_range(0..samples.len())])
            .collect();
        let mut assignment = vec![0usize; samples.len()];

        for _ in 0..self.max_iterations {
            let mut changed = false;
            for (i, sample) in samples.iter().enumerate() {
                let nearest = nearest_centroid(sample, &centroids);
                if assignment[i] != nearest {
                    assignment[i] = nearest;
                    changed = true;
                }
            }

            let mut sums = vec![(0.0f32, 0.0f32, 0.0f32, 0usize); k];
            for (sample, &cluster) in samples.iter().zip(&assignment) {
                let s = &mut sums[cluster];
                s.0 += sample.l;
                s.1 += sample.a;
                s.2 += sample.b;
                s.3 += 1;
            }
            for (centroid, (l, a, b, n)) in centroids.iter_mut().zip(sums) {
                if n > 0 {
                    *centroid = Lab::new(l / n as f32, a / n as f32, b / n as f32);
                }
            }

            if !changed {
                break;
            }
        }

        let (width, height) = image.dimensions();
        let palette: Vec<Rgb<u8>> = centroids.iter().map(lab_to_rgb).collect();
        RgbImage::from_fn(width, height, |x, y| {
            palette[assignment[(y * width + x) as usize]]
        })
    }
}

fn nearest_centroid(sample: &Lab, centroids: &[Lab]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let (dl, da, db) = (sample.l - c.l, sample.a - c.a, sample.b - c.b);
        let dist = dl * dl + da * da + db * db;
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

fn rgb_to_lab(p: &Rgb<u8>) -> Lab {
    let srgb: Srgb<f32> = Srgb::new(
        p[0] as f32 / 255.0,
        p[1] as f32 / 255.0,
        p[2] as f32 / 255.0,
    );
    Lab::from_color(srgb.into_linear())
}

fn lab_to_rgb(lab: &Lab) -> Rgb<u8> {
    let lin: LinSrgb<f32> = (*lab).into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);
    Rgb([
        (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    ])
}
