//! Non-local means denoising restricted to a region
//!
//! Works in Lab space: lightness is filtered with strength `h`, the chroma
//! pair with `h_color`. Each pixel becomes the weighted mean of the pixels in
//! its search window, weighted by `exp(-d / h^2)` where `d` is the mean squared
//! difference between the two surrounding patches. Borders reflect (101).
//!
//! Only pixels selected by the region are computed; everything else is copied.

use image::{GrayImage, RgbImage};
use rayon::prelude::*;
use tracing::debug;

use super::lab::LabPlanes;
use crate::filter::BorderMode;

/// Weights below this are treated as zero
const MIN_WEIGHT: f32 = 0.001;

/// Non-local means parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NlMeansOptions {
    /// Filter strength for lightness
    pub h: f32,

    /// Filter strength for the chroma channels
    pub h_color: f32,

    /// Patch side (odd)
    pub template_window: u32,

    /// Search window side (odd)
    pub search_window: u32,
}

impl Default for NlMeansOptions {
    fn default() -> Self {
        Self {
            h: 3.0,
            h_color: 3.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

/// Denoise the pixels of `image` where `region` is nonzero
pub fn nl_means_colored_in_region(image: &RgbImage, region: &GrayImage, options: &NlMeansOptions) -> RgbImage {
    let (width, height) = image.dimensions();
    let selected = region.iter().filter(|&&v| v != 0).count();
    if selected == 0 || width == 0 || height == 0 {
        return image.clone();
    }
    debug!(selected, "non-local means denoise");

    let lab = LabPlanes::from_rgb(image);
    let l = denoise_planes(&[&lab.l], region, options.h, options);
    let ab = denoise_planes(&[&lab.a, &lab.b], region, options.h_color, options);

    let mut iter = ab.into_iter();
    let (Some(a), Some(b)) = (iter.next(), iter.next()) else {
        return image.clone();
    };
    let Some(l) = l.into_iter().next() else {
        return image.clone();
    };

    let denoised = LabPlanes { l, a, b }.to_rgb();

    // Untouched pixels keep their exact original value rather than a Lab round trip
    let mut out = image.clone();
    for ((dst, src), &r) in out
        .pixels_mut()
        .zip(denoised.pixels())
        .zip(region.as_raw().iter())
    {
        if r != 0 {
            *dst = *src;
        }
    }
    out
}

/// Copy `plane` into a buffer with `pad` reflect-101 pixels on every side
fn pad_plane(plane: &GrayImage, pad: usize) -> (Vec<f32>, usize) {
    let (width, height) = plane.dimensions();
    let (w, h) = (width as usize, height as usize);
    let stride = w + 2 * pad;
    let mut out = Vec::with_capacity(stride * (h + 2 * pad));
    for py in 0..h + 2 * pad {
        let sy = BorderMode::Reflect101.index(py as isize - pad as isize, h);
        for px in 0..stride {
            let sx = BorderMode::Reflect101.index(px as isize - pad as isize, w);
            out.push(plane.as_raw()[sy * w + sx] as f32);
        }
    }
    (out, stride)
}

/// Jointly filter `planes` (patch distance summed over all of them)
fn denoise_planes(planes: &[&GrayImage], region: &GrayImage, h: f32, options: &NlMeansOptions) -> Vec<GrayImage> {
    let (width, height) = region.dimensions();
    let (w, h_px) = (width as usize, height as usize);
    let cn = planes.len();
    let t_half = (options.template_window / 2) as usize;
    let s_half = (options.search_window / 2) as usize;
    let pad = t_half + s_half;
    let patch_norm = ((2 * t_half + 1) * (2 * t_half + 1) * cn) as f32;
    let inv_h2 = 1.0 / (h * h).max(f32::EPSILON);
    let mask = region.as_raw();

    let padded: Vec<Vec<f32>> = planes.iter().map(|p| pad_plane(p, pad).0).collect();
    let stride = w + 2 * pad;

    let rows: Vec<Vec<(usize, Vec<u8>)>> = (0..h_px)
        .into_par_iter()
        .map(|y| {
            let mut row: Vec<(usize, Vec<u8>)> = Vec::new();
            for x in 0..w {
                if mask[y * w + x] == 0 {
                    continue;
                }
                // Centre in padded coordinates
                let (cx, cy) = (x + pad, y + pad);
                let mut acc = vec![0.0f32; cn];
                let mut total = 0.0f32;

                for sy in cy - s_half..=cy + s_half {
                    for sx in cx - s_half..=cx + s_half {
                        let mut dist = 0.0f32;
                        for plane in &padded {
                            for ty in 0..=2 * t_half {
                                let a = (cy + ty - t_half) * stride + cx - t_half;
                                let b = (sy + ty - t_half) * stride + sx - t_half;
                                for k in 0..=2 * t_half {
                                    let d = plane[a + k] - plane[b + k];
                                    dist += d * d;
                                }
                            }
                        }
                        let weight = (-(dist / patch_norm) * inv_h2).exp();
                        if weight < MIN_WEIGHT {
                            continue;
                        }
                        for (a, plane) in acc.iter_mut().zip(&padded) {
                            *a += weight * plane[sy * stride + sx];
                        }
                        total += weight;
                    }
                }

                // The centre patch always matches itself, so total >= 1
                let values: Vec<u8> = acc
                    .iter()
                    .map(|a| (a / total).round().clamp(0.0, 255.0) as u8)
                    .collect();
                row.push((x, values));
            }
            row
        })
        .collect();

    let mut out: Vec<Vec<u8>> = planes.iter().map(|p| p.as_raw().to_vec()).collect();
    for (y, row) in rows.into_iter().enumerate() {
        for (x, values) in row {
            for (c, v) in values.into_iter().enumerate() {
                out[c][y * w + x] = v;
            }
        }
    }

    out.into_iter()
        .filter_map(|data| GrayImage::from_raw(width, height, data))
        .collect()
}
