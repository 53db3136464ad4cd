//! Telea weighting for fast marching inpainting
//!
//! Each known neighbour `q` within the radius contributes its color, weighted by
//!
//! - direction: `|r . grad T| / |r|`, favouring neighbours along the marching normal
//! - distance: `1 / |r|^3`
//! - level set: `1 / (1 + |T(q) - T(p)|)`
//!
//! where `r = p - q`. A first-order term built from the neighbours' color
//! gradients nudges the estimate along the local slope.

use super::fmm::MarchState;

/// Direction weights at or below this are replaced by [`DIRECTION_FLOOR`]
const DIRECTION_CUTOFF: f32 = 0.01;
const DIRECTION_FLOOR: f32 = 1.0e-6;

pub(crate) fn estimate(state: &MarchState, x: isize, y: isize, range: isize) -> Option<[u8; 3]> {
    let (grad_tx, grad_ty) = state.distance_gradient(x, y);
    let t_here = state.distance(x, y);
    let range_sq = (range * range) as f32;

    let mut weighted = [0.0f32; 3];
    let mut jx = [0.0f32; 3];
    let mut jy = [0.0f32; 3];
    let mut total = 0.0f32;

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
            let len = len_sq.sqrt();

            let dst = 1.0 / (len_sq * len);
            let lev = 1.0 / (1.0 + (state.distance(kx, ky) - t_here).abs());
            let mut dir = (rx * grad_tx + ry * grad_ty).abs() / len;
            if dir <= DIRECTION_CUTOFF {
                dir = DIRECTION_FLOOR;
            }
            let w = (dst * lev * dir).abs();

            for c in 0..3 {
                let (gx, gy) = state.color_gradient(kx, ky, c);
                weighted[c] += w * state.value(kx, ky, c);
                jx[c] -= w * gx * rx;
                jy[c] -= w * gy * ry;
            }
            total += w;
        }
    }

    if total <= 0.0 {
        return None;
    }

    let mut out = [0u8; 3];
    for c in 0..3 {
        let norm = (jx[c] * jx[c] + jy[c] * jy[c]).sqrt();
        let correction = if norm > 0.0 { (jx[c] + jy[c]) / norm } else { 0.0 };
        let v = weighted[c] / total + correction;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}
