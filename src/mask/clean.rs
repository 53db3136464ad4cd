//! Candidate mask cleaning: opening, regrowth, component area filter

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::{debug, instrument};

use super::threshold::{MASK_OFF, MASK_ON};
use crate::config::{HairRemovalConfig, DEFAULT_MIN_COMPONENT_AREA};
use crate::morphology::{dilate, open, StructuringElement};

/// Size of the elliptical element used for opening and regrowth
const CLEANING_ELEMENT_SIZE: u32 = 3;

/// Cleans a candidate mask into the final hair mask
#[derive(Debug, Clone)]
pub struct MaskCleaner {
    element: StructuringElement,
    min_component_area: u32,
}

impl Default for MaskCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COMPONENT_AREA)
    }
}

impl MaskCleaner {
    /// Cleaner discarding components smaller than `min_component_area`
    pub fn new(min_component_area: u32) -> Self {
        Self {
            element: StructuringElement::ellipse(CLEANING_ELEMENT_SIZE, CLEANING_ELEMENT_SIZE),
            min_component_area,
        }
    }

    /// Cleaner configured from the pipeline options
    pub fn from_config(config: &HairRemovalConfig) -> Self {
        Self::new(config.min_component_area)
    }

    /// Minimum area a component needs to survive
    pub fn min_component_area(&self) -> u32 {
        self.min_component_area
    }

    /// Open, dilate once, then drop small 8-connected components
    ///
    /// Regrowth is bounded by the candidate, so the result is always a
    /// subset of it. An unconstrained open-then-dilate would also add a
    /// one-pixel halo around every strand; that halo is not part of the
    /// mask here and is left out of inpainting.
    #[instrument(skip_all, fields(min_area = self.min_component_area))]
    pub fn clean(&self, candidate: &GrayImage) -> GrayImage {
        let opened = open(candidate, &self.element);
        let regrown = intersect(&dilate(&opened, &self.element), candidate);
        remove_small_components(&regrown, self.min_component_area)
    }
}

/// Clean `candidate` with the default element and the given area limit
pub fn clean_mask(candidate: &GrayImage, min_component_area: u32) -> GrayImage {
    MaskCleaner::new(min_component_area).clean(candidate)
}

/// Pixels set in both masks
fn intersect(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = a.clone();
    for (p, q) in out.iter_mut().zip(b.iter()) {
        if *q != MASK_ON {
            *p = MASK_OFF;
        }
    }
    out
}

/// Zero every 8-connected foreground component with fewer than `min_area` pixels
///
/// Each component is judged by its own area only, so the labelling order has
/// no influence on the result.
pub fn remove_small_components(mask: &GrayImage, min_area: u32) -> GrayImage {
    let labels = connected_components(mask, Connectivity::Eight, Luma([MASK_OFF]));

    let max_label = labels.iter().copied().max().unwrap_or(0) as usize;
    let mut areas = vec![0u32; max_label + 1];
    for &label in labels.iter() {
        areas[label as usize] += 1;
    }

    let kept = areas
        .iter()
        .skip(1)
        .filter(|&&area| area >= min_area)
        .count();
    debug!(components = max_label, kept, "component area filter");

    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        if label != 0 && areas[label] >= min_area {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn components(mask: &GrayImage) -> Vec<u32> {
        let labels = connected_components(mask, Connectivity::Eight, Luma([MASK_OFF]));
        let max = labels.iter().copied().max().unwrap_or(0) as usize;
        let mut areas = vec![0u32; max + 1];
        for &l in labels.iter() {
            areas[l as usize] += 1;
        }
        areas.into_iter().skip(1).collect()
    }

    #[test]
    fn test_remove_small_components() {
        let mut mask = GrayImage::new(30, 30);
        // 3x3 blob (9 px) and a 4x3 blob (12 px)
        draw_filled_rect_mut(&mut mask, Rect::at(2, 2).of_size(3, 3), Luma([MASK_ON]));
        draw_filled_rect_mut(&mut mask, Rect::at(15, 15).of_size(4, 3), Luma([MASK_ON]));

        let cleaned = remove_small_components(&mask, 10);
        assert_eq!(cleaned.get_pixel(3, 3).0[0], MASK_OFF);
        assert_eq!(cleaned.get_pixel(16, 16).0[0], MASK_ON);
        assert_eq!(components(&cleaned), vec![12]);
    }

    #[test]
    fn test_diagonal_pixels_form_one_component() {
        let mut mask = GrayImage::new(20, 20);
        for i in 0..10 {
            mask.put_pixel(i, i, Luma([MASK_ON]));
        }
        let cleaned = remove_small_components(&mask, 10);
        assert_eq!(cleaned, mask);
    }

    #[test]
    fn test_clean_removes_isolated_pixel() {
        let mut mask = GrayImage::new(40, 40);
        mask.put_pixel(5, 5, Luma([MASK_ON]));
        draw_filled_rect_mut(&mut mask, Rect::at(10, 20).of_size(25, 4), Luma([MASK_ON]));

        let cleaned = MaskCleaner::default().clean(&mask);
        assert_eq!(cleaned.get_pixel(5, 5).0[0], MASK_OFF);
        assert_eq!(cleaned.get_pixel(20, 21).0[0], MASK_ON);
    }

    #[test]
    fn test_clean_never_adds_components() {
        let mut mask = GrayImage::new(50, 50);
        draw_filled_rect_mut(&mut mask, Rect::at(5, 5).of_size(30, 3), Luma([MASK_ON]));
        for i in 0..6 {
            mask.put_pixel(40 + i % 3, 40 + i, Luma([MASK_ON]));
        }

        let cleaned = clean_mask(&mask, 10);
        assert!(cleaned.iter().all(|&v| v == MASK_ON || v == MASK_OFF));
        assert!(components(&cleaned).iter().all(|&area| area >= 10));
    }

    #[test]
    fn test_clean_stays_inside_candidate() {
        let mut mask = GrayImage::new(30, 30);
        // A solid block would grow into a diamond without the bound
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(5, 5), Luma([MASK_ON]));
        mask.put_pixel(20, 20, Luma([MASK_ON]));

        let cleaned = MaskCleaner::new(1).clean(&mask);
        for (p, q) in cleaned.iter().zip(mask.iter()) {
            assert!(*p == MASK_OFF || *q == MASK_ON);
        }
        assert_eq!(cleaned.get_pixel(12, 12).0[0], MASK_ON);
        assert_eq!(cleaned.get_pixel(20, 20).0[0], MASK_OFF);
    }

    #[test]
    fn test_clean_empty_mask() {
        let mask = GrayImage::new(16, 16);
        assert_eq!(clean_mask(&mask, 10), mask);
    }

    #[test]
    fn test_from_config() {
        let config = HairRemovalConfig::builder().min_component_area(25).build();
        assert_eq!(MaskCleaner::from_config(&config).min_component_area(), 25);
    }
}
