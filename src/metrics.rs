//! Informational statistics of a pipeline run

use image::{GrayImage, RgbImage};
use serde::Serialize;

use crate::mask::MASK_ON;
use crate::types::{ensure_same_dimensions, Result};

/// Statistics reported alongside the reconstructed image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Percentage of candidate mask pixels flagged as hair
    pub initial_hair_coverage: f64,

    /// Percentage of final mask pixels flagged as hair
    pub final_hair_coverage: f64,

    /// Number of pixels in the final mask
    pub final_hair_pixels: u64,

    /// PSNR in dB between the resized original and the result
    ///
    /// Infinite when the two are identical (serialized as `null`).
    pub psnr: f64,
}

impl PipelineStats {
    /// Compute all statistics from the stage outputs
    pub fn compute(
        candidate: &GrayImage,
        final_mask: &GrayImage,
        original: &RgbImage,
        reconstructed: &RgbImage,
    ) -> Result<Self> {
        Ok(Self {
            initial_hair_coverage: coverage_percent(candidate),
            final_hair_coverage: coverage_percent(final_mask),
            final_hair_pixels: count_mask_pixels(final_mask),
            psnr: psnr(original, reconstructed)?,
        })
    }

    /// Whether the reconstruction is pixel-identical to the original
    pub fn is_lossless(&self) -> bool {
        self.psnr.is_infinite()
    }
}

/// Number of pixels equal to 255
pub fn count_mask_pixels(mask: &GrayImage) -> u64 {
    mask.iter().filter(|&&v| v == MASK_ON).count() as u64
}

/// Percentage of pixels equal to 255 (0 for an empty mask)
pub fn coverage_percent(mask: &GrayImage) -> f64 {
    let total = mask.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    count_mask_pixels(mask) as f64 / total as f64 * 100.0
}

/// Mean squared per-channel difference
pub fn mean_squared_error(a: &RgbImage, b: &RgbImage) -> Result<f64> {
    ensure_same_dimensions(a.dimensions(), b.dimensions())?;
    let n = a.as_raw().len();
    if n == 0 {
        return Ok(0.0);
    }
    let sum: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / n as f64)
}

/// Peak signal-to-noise ratio `20 * log10(255 / sqrt(MSE))`
///
/// Returns `f64::INFINITY` when the images are identical.
pub fn psnr(original: &RgbImage, reconstructed: &RgbImage) -> Result<f64> {
    let mse = mean_squared_error(original, reconstructed)?;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(20.0 * (255.0 / mse.sqrt()).log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_coverage_percent() {
        let mut mask = GrayImage::new(10, 10);
        for x in 0..5 {
            mask.put_pixel(x, 0, Luma([255]));
        }
        // Non-255 values are not hair
        mask.put_pixel(9, 9, Luma([128]));
        assert!((coverage_percent(&mask) - 5.0).abs() < 1e-12);
        assert_eq!(count_mask_pixels(&mask), 5);
    }

    #[test]
    fn test_coverage_empty_image() {
        assert_eq!(coverage_percent(&GrayImage::new(0, 0)), 0.0);
    }

    #[test]
    fn test_psnr_identical_is_infinite() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        assert!(psnr(&image, &image).unwrap().is_infinite());
    }

    #[test]
    fn test_psnr_known_value() {
        let a = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let b = RgbImage::from_pixel(4, 4, Rgb([110, 110, 110]));
        // MSE = 100 -> 20 * log10(25.5)
        let value = psnr(&a, &b).unwrap();
        assert!((value - 20.0 * 25.5f64.log10()).abs() < 1e-9);
        assert!(value > 0.0);
    }

    #[test]
    fn test_psnr_worst_case_is_zero() {
        let a = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let b = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        assert!(psnr(&a, &b).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_psnr_dimension_mismatch() {
        let a = RgbImage::new(2, 2);
        let b = RgbImage::new(3, 2);
        assert!(psnr(&a, &b).is_err());
    }

    #[test]
    fn test_stats_serialize_infinite_psnr_as_null() {
        let stats = PipelineStats {
            initial_hair_coverage: 0.0,
            final_hair_coverage: 0.0,
            final_hair_pixels: 0,
            psnr: f64::INFINITY,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert!(json["psnr"].is_null());
        assert!(stats.is_lossless());
    }

    #[test]
    fn test_stats_compute() {
        let candidate = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 2 { 255 } else { 0 }]));
        let final_mask = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 1 { 255 } else { 0 }]));
        let image = RgbImage::from_pixel(10, 10, Rgb([50, 60, 70]));

        let stats = PipelineStats::compute(&candidate, &final_mask, &image, &image).unwrap();
        assert!((stats.initial_hair_coverage - 20.0).abs() < 1e-12);
        assert!((stats.final_hair_coverage - 10.0).abs() < 1e-12);
        assert_eq!(stats.final_hair_pixels, 10);
        assert!(stats.is_lossless());
    }
}
