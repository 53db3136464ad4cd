//! Inpainting of masked hair pixels
//!
//! Both reconstructions share one fast marching engine and differ only in how
//! known neighbours are weighted:
//!
//! - [`InpaintMethod::Telea`]: direction, distance and level-set weights
//! - [`InpaintMethod::NavierStokes`]: weights along local isophotes
//!
//! [`InpaintMode::Careful`] runs Telea (radius 2) and Navier-Stokes (radius 3)
//! in parallel and averages them with equal weight. [`InpaintMode::Fast`] runs
//! Telea alone with the configured radius. Either way, pixels outside the mask
//! are returned unchanged.

mod fmm;
mod navier_stokes;
mod telea;

pub use fmm::{march, InpaintMethod};

use image::{GrayImage, Rgb, RgbImage};
use tracing::{debug, instrument};

use crate::config::{HairRemovalConfig, InpaintMode};
use crate::types::{ensure_same_dimensions, Result};

// ============================================================
// Constants
// ============================================================

/// Telea radius of the careful blend
pub const CAREFUL_TELEA_RADIUS: f32 = 2.0;

/// Navier-Stokes radius of the careful blend
pub const CAREFUL_NAVIER_STOKES_RADIUS: f32 = 3.0;

/// Weight of the Telea reconstruction in the careful blend
pub const CAREFUL_BLEND_WEIGHT: f32 = 0.5;

// ============================================================
// Inpainter
// ============================================================

/// Inpainting options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inpainter {
    /// Careful blend or single fast pass
    pub mode: InpaintMode,

    /// Radius of the fast pass
    pub radius: f32,
}

impl Default for Inpainter {
    fn default() -> Self {
        Self::from_config(&HairRemovalConfig::default())
    }
}

impl Inpainter {
    /// Inpainter configured from the pipeline options
    pub fn from_config(config: &HairRemovalConfig) -> Self {
        Self {
            mode: config.inpaint_mode,
            radius: config.inpainting_radius,
        }
    }

    /// Reconstruct the masked pixels of `image`
    pub fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
        inpaint(image, mask, self.mode, self.radius)
    }
}

/// Reconstruct every pixel where `mask` is nonzero
///
/// `radius` is only used by [`InpaintMode::Fast`]; the careful blend always
/// uses radii 2 and 3.
///
/// # Errors
///
/// `DimensionMismatch` when the mask and image sizes differ.
#[instrument(skip_all, fields(mode = ?mode))]
pub fn inpaint(image: &RgbImage, mask: &GrayImage, mode: InpaintMode, radius: f32) -> Result<RgbImage> {
    ensure_same_dimensions(image.dimensions(), mask.dimensions())?;

    match mode {
        InpaintMode::Careful => {
            let (telea, navier_stokes) = rayon::join(
                || march(image, mask, CAREFUL_TELEA_RADIUS, InpaintMethod::Telea),
                || march(image, mask, CAREFUL_NAVIER_STOKES_RADIUS, InpaintMethod::NavierStokes),
            );
            debug!("careful blend of Telea and Navier-Stokes");
            Ok(blend_inside_mask(image, &telea, &navier_stokes, mask))
        }
        InpaintMode::Fast => Ok(march(image, mask, radius, InpaintMethod::Telea)),
    }
}

/// Telea reconstruction with the given radius
pub fn inpaint_telea(image: &RgbImage, mask: &GrayImage, radius: f32) -> Result<RgbImage> {
    ensure_same_dimensions(image.dimensions(), mask.dimensions())?;
    Ok(march(image, mask, radius, InpaintMethod::Telea))
}

/// Navier-Stokes reconstruction with the given radius
pub fn inpaint_navier_stokes(image: &RgbImage, mask: &GrayImage, radius: f32) -> Result<RgbImage> {
    ensure_same_dimensions(image.dimensions(), mask.dimensions())?;
    Ok(march(image, mask, radius, InpaintMethod::NavierStokes))
}

/// Average `a` and `b` where the mask is set, keep `original` elsewhere
fn blend_inside_mask(original: &RgbImage, a: &RgbImage, b: &RgbImage, mask: &GrayImage) -> RgbImage {
    let (width, height) = original.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y).0[0] == 0 {
            return *original.get_pixel(x, y);
        }
        let pa = a.get_pixel(x, y).0;
        let pb = b.get_pixel(x, y).0;
        let mut out = [0u8; 3];
        for c in 0..3 {
            let v = pa[c] as f32 * CAREFUL_BLEND_WEIGHT + pb[c] as f32 * (1.0 - CAREFUL_BLEND_WEIGHT);
            out[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}
