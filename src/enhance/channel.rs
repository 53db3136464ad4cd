//! Per-channel hair enhancement: top-hat, brightening, flat-field correction

use image::{GrayImage, Luma};
use tracing::debug;

use crate::config::HairRemovalConfig;
use crate::filter::{gaussian_blur, BorderMode};
use crate::morphology::{black_tophat, StructuringElement};

// ============================================================
// Constants
// ============================================================

/// Guard against division by an all-dark illumination field
const FFC_EPSILON: f32 = 1e-6;

/// Top-hat responses above this count toward the diagnostic coverage
const TOPHAT_RESPONSE_LEVEL: u8 = 5;

// ============================================================
// Types
// ============================================================

/// Parameters of [`process_channel`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    /// Radius of the elliptical top-hat element
    pub tophat_radius: u32,

    /// Fraction of the remaining headroom added during brightening
    pub brightening_factor: f32,

    /// Gaussian sigma of the illumination field
    pub ffc_sigma: f32,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self::from(&HairRemovalConfig::default())
    }
}

impl From<&HairRemovalConfig> for ChannelParams {
    fn from(config: &HairRemovalConfig) -> Self {
        Self {
            tophat_radius: config.tophat_radius,
            brightening_factor: config.brightening_factor,
            ffc_sigma: config.ffc_sigma,
        }
    }
}

// ============================================================
// Stages
// ============================================================

/// Enhance one color channel into a hair-likelihood map
///
/// 1. Black top-hat with a disk of `tophat_radius`
/// 2. Brighten: `v + (255 - v) * brightening_factor`
/// 3. Flat-field correction with a Gaussian field of `ffc_sigma`
pub fn process_channel(channel: &GrayImage, params: &ChannelParams) -> GrayImage {
    let element = StructuringElement::disk(params.tophat_radius);
    let tophat = black_tophat(channel, &element);

    debug!(
        coverage_percent = response_coverage(&tophat, TOPHAT_RESPONSE_LEVEL),
        "top-hat non-zero (>{}) coverage", TOPHAT_RESPONSE_LEVEL
    );

    let brightened = brighten(&tophat, params.brightening_factor);
    let ffc = flat_field_correct(&brightened, params.ffc_sigma);

    debug!(mean = mean_intensity(&ffc), "FFC mean intensity");
    ffc
}

/// Push every pixel toward white by `factor` of its remaining headroom
pub fn brighten(image: &GrayImage, factor: f32) -> GrayImage {
    let mut out = image.clone();
    for p in out.iter_mut() {
        let v = *p as f32;
        *p = (v + (255.0 - v) * factor).clamp(0.0, 255.0) as u8;
    }
    out
}

/// Divide by a smooth illumination estimate and rescale by its global mean
pub fn flat_field_correct(image: &GrayImage, sigma: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let plane: Vec<f32> = image.as_raw().iter().map(|&v| v as f32).collect();
    let field = gaussian_blur(
        &plane,
        width as usize,
        height as usize,
        sigma,
        BorderMode::Reflect101,
    );

    let mean_field = if field.is_empty() {
        0.0
    } else {
        (field.iter().map(|&v| v as f64).sum::<f64>() / field.len() as f64) as f32
    };

    GrayImage::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize;
        let corrected = plane[i] / (field[i] + FFC_EPSILON) * mean_field;
        Luma([corrected.clamp(0.0, 255.0) as u8])
    })
}

/// Percentage of pixels strictly above `level`
fn response_coverage(image: &GrayImage, level: u8) -> f64 {
    let total = image.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let count = image.as_raw().iter().filter(|&&v| v > level).count();
    count as f64 / total as f64 * 100.0
}

fn mean_intensity(image: &GrayImage) -> f64 {
    let raw = image.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|&v| v as f64).sum::<f64>() / raw.len() as f64
}
