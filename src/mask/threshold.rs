//! Binarization of the fused enhancement map

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::{debug, info};

use crate::config::ThresholdMode;
use crate::filter::{gaussian_blur_gray, BorderMode};

/// Foreground value of binary masks
pub const MASK_ON: u8 = 255;

/// Background value of binary masks
pub const MASK_OFF: u8 = 0;

/// Binarize `map` with the selected strategy
pub fn apply_threshold(map: &GrayImage, mode: ThresholdMode, block_size: u32) -> GrayImage {
    match mode {
        ThresholdMode::Otsu => threshold_otsu(map),
        ThresholdMode::Adaptive => threshold_adaptive(map, block_size),
    }
}

/// Global Otsu binarization: pixels strictly above the level become 255
///
/// A map holding a single intensity has no second class, so the result is
/// empty.
pub fn threshold_otsu(map: &GrayImage) -> GrayImage {
    let (width, height) = map.dimensions();
    let raw = map.as_raw();
    let (Some(&min), Some(&max)) = (raw.iter().min(), raw.iter().max()) else {
        return GrayImage::new(width, height);
    };
    if min == max {
        info!(level = min, "uniform map, Otsu threshold not applicable");
        return GrayImage::new(width, height);
    }

    let level = otsu_level(map);
    info!(level, "Otsu threshold");
    binarize_above(map, level)
}

/// Local binarization against a Gaussian-weighted neighbourhood mean
///
/// The weighting window is `block_size` square (forced odd, at least 3) with
/// sigma derived from it; borders replicate the edge pixel.
pub fn threshold_adaptive(map: &GrayImage, block_size: u32) -> GrayImage {
    let block = (block_size.max(3) | 1) as usize;
    let mean = gaussian_blur_gray(map, block, 0.0, BorderMode::Replicate);
    debug!(block, "adaptive threshold");

    let (width, height) = map.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let v = map.get_pixel(x, y).0[0];
        let m = mean.get_pixel(x, y).0[0];
        Luma([if v > m { MASK_ON } else { MASK_OFF }])
    })
}

/// Pixels strictly above `level` become 255, the rest 0
pub fn binarize_above(map: &GrayImage, level: u8) -> GrayImage {
    let mut out = map.clone();
    for p in out.iter_mut() {
        *p = if *p > level { MASK_ON } else { MASK_OFF };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_binary(mask: &GrayImage) -> bool {
        mask.iter().all(|&v| v == MASK_ON || v == MASK_OFF)
    }

    #[test]
    fn test_otsu_bimodal() {
        let map = GrayImage::from_fn(40, 40, |x, _| Luma([if x < 30 { 60 } else { 220 }]));
        let mask = threshold_otsu(&map);
        assert!(is_binary(&mask));
        assert_eq!(mask.get_pixel(5, 5).0[0], MASK_OFF);
        assert_eq!(mask.get_pixel(35, 5).0[0], MASK_ON);
    }

    #[test]
    fn test_otsu_uniform_is_empty() {
        for value in [0u8, 178, 255] {
            let map = GrayImage::from_pixel(16, 16, Luma([value]));
            let mask = threshold_otsu(&map);
            assert!(mask.iter().all(|&v| v == MASK_OFF));
        }
    }

    #[test]
    fn test_otsu_empty_map() {
        let map = GrayImage::new(0, 0);
        assert_eq!(threshold_otsu(&map).dimensions(), (0, 0));
    }

    #[test]
    fn test_adaptive_follows_local_contrast() {
        // Two halves with very different brightness, each with a bright stripe
        let map = GrayImage::from_fn(80, 40, |x, y| {
            let base = if x < 40 { 40 } else { 180 };
            Luma([if y == 20 { base + 50 } else { base }])
        });
        let mask = threshold_adaptive(&map, 11);
        assert!(is_binary(&mask));
        assert_eq!(mask.get_pixel(10, 20).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(70, 20).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(10, 5).0[0], MASK_OFF);
        assert_eq!(mask.get_pixel(70, 5).0[0], MASK_OFF);
    }

    #[test]
    fn test_adaptive_uniform_is_empty() {
        let map = GrayImage::from_pixel(30, 30, Luma([200]));
        let mask = threshold_adaptive(&map, 35);
        assert!(mask.iter().all(|&v| v == MASK_OFF));
    }

    #[test]
    fn test_apply_threshold_dispatch() {
        let map = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 10 } else { 240 }]));
        assert_eq!(
            apply_threshold(&map, ThresholdMode::Otsu, 35),
            threshold_otsu(&map)
        );
        assert_eq!(
            apply_threshold(&map, ThresholdMode::Adaptive, 7),
            threshold_adaptive(&map, 7)
        );
    }

    #[test]
    fn test_binarize_above() {
        let map = GrayImage::from_fn(3, 1, |x, _| Luma([[99u8, 100, 101][x as usize]]));
        let mask = binarize_above(&map, 100);
        assert_eq!(mask.as_raw(), &vec![0, 0, 255]);
    }
}
