//! Navier-Stokes style weighting for fast marching inpainting
//!
//! Image intensity is treated like a stream function: values are transported
//! along isophotes (lines of constant intensity). A known neighbour `q`
//! contributes in proportion to how well the offset `r = p - q` lines up with
//! the isophote direction at `q`, scaled by `1 / (|r|^2 + 1)`. Neighbours in
//! flat areas, where no isophote is defined, contribute isotropically.

use super::fmm::MarchState;

/// Gradients weaker than this do not define an isophote
const MIN_GRADIENT: f32 = 0.01;

/// Alignment of neighbours without a defined isophote
const ISOTROPIC_ALIGNMENT: f32 = 1.0;

/// Lower bound for neighbours lying across the isophote
const MIN_ALIGNMENT: f32 = 1.0e-6;

pub(crate) fn estimate(state: &MarchState, x: isize, y: isize, range: isize) -> Option<[u8; 3]> {
    let range_sq = (range * range) as f32;

    let mut weighted = [0.0f32; 3];
    let mut total = [0.0f32; 3];

    for ky in y - range..=y + range {
        for kx in x - range..=x + range {
            if !state.is_known(kx, ky) {
                continue;
            }
            let rx = (x - kx) as f32;
            let ry = (y - ky) as f32;
            let len_sq = rx * rx + ry * ry;
            if len_sq > range_sq || len_sq == 0.0 {
                continue;
            }
            let dst = 1.0 / (len_sq + 1.0);

            for c in 0..3 {
                let (gx, gy) = state.color_gradient(kx, ky, c);
                let alignment = if gx.abs() >= MIN_GRADIENT || gy.abs() >= MIN_GRADIENT {
                    // Isophote direction is the gradient rotated by 90 degrees
                    let (ix, iy) = (-gy, gx);
                    ((rx * ix + ry * iy) / ((len_sq * (ix * ix + iy * iy)).sqrt())).abs()
                } else {
                    ISOTROPIC_ALIGNMENT
                };
                let w = dst * alignment.max(MIN_ALIGNMENT);
                weighted[c] += w * state.value(kx, ky, c);
                total[c] += w;
            }
        }
    }

    if total.iter().any(|&t| t <= 0.0) {
        return None;
    }

    let mut out = [0u8; 3];
    for c in 0..3 {
        out[c] = (weighted[c] / total[c]).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}
