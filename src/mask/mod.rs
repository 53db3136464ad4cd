//! Hair mask extraction
//!
//! The fused enhancement map is binarized into a candidate mask (global Otsu
//! or local adaptive threshold) and then cleaned into the final mask:
//!
//! 1. Opening with a 3x3 ellipse removes single-pixel noise
//! 2. One dilation, bounded by the candidate, regrows strands thinned by
//!    the opening
//! 3. 8-connected components smaller than the area limit are discarded
//!
//! Masks are 8-bit rasters holding only 0 and 255.

mod clean;
mod threshold;

pub use clean::{clean_mask, remove_small_components, MaskCleaner};
pub use threshold::{
    apply_threshold, binarize_above, threshold_adaptive, threshold_otsu, MASK_OFF, MASK_ON,
};
