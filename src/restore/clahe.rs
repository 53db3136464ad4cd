//! Contrast-limited adaptive histogram equalization
//!
//! The image is split into a grid of tiles (padded with reflect-101 borders
//! when the size is not a multiple of the grid). Each tile gets a clipped,
//! redistributed histogram and its equalization LUT; every pixel is then
//! mapped through the four nearest tile LUTs with bilinear weights.

use image::GrayImage;
use rayon::prelude::*;

use crate::filter::BorderMode;

const BINS: usize = 256;

/// CLAHE parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheOptions {
    /// Contrast limit relative to a uniform histogram
    pub clip_limit: f32,

    /// Tile grid (columns, rows)
    pub grid: (u32, u32),
}

impl Default for ClaheOptions {
    fn default() -> Self {
        Self {
            clip_limit: 1.5,
            grid: (8, 8),
        }
    }
}

/// Apply CLAHE to an 8-bit single-channel image
pub fn clahe(image: &GrayImage, options: &ClaheOptions) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = options.grid.0.max(1) as usize;
    let tiles_y = options.grid.1.max(1) as usize;
    let (w, h) = (width as usize, height as usize);

    let padded_w = w.div_ceil(tiles_x) * tiles_x;
    let padded_h = h.div_ceil(tiles_y) * tiles_y;
    let tile_w = padded_w / tiles_x;
    let tile_h = padded_h / tiles_y;
    let tile_area = tile_w * tile_h;

    let clip = if options.clip_limit > 0.0 {
        ((options.clip_limit * tile_area as f32 / BINS as f32) as usize).max(1)
    } else {
        usize::MAX
    };
    let lut_scale = (BINS - 1) as f32 / tile_area as f32;
    let src = image.as_raw();

    // Padded coordinates map back into the image with reflect-101
    let sample = |x: usize, y: usize| -> u8 {
        let sx = BorderMode::Reflect101.index(x as isize, w);
        let sy = BorderMode::Reflect101.index(y as isize, h);
        src[sy * w + sx]
    };

    let luts: Vec<[u8; BINS]> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|t| {
            let (tx, ty) = (t % tiles_x, t / tiles_x);
            let mut hist = [0usize; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                for x in tx * tile_w..(tx + 1) * tile_w {
                    hist[sample(x, y) as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);
            equalization_lut(&hist, lut_scale)
        })
        .collect();

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;

    // Horizontal interpolation terms are the same for every row
    let columns: Vec<(usize, usize, f32)> = (0..w)
        .map(|x| {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor();
            let xa = txf - tx1;
            let tx1 = tx1 as isize;
            let left = tx1.max(0) as usize;
            let right = ((tx1 + 1) as usize).min(tiles_x - 1);
            (left, right, xa)
        })
        .collect();

    let mut out = vec![0u8; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor();
        let ya = tyf - ty1;
        let ty1 = ty1 as isize;
        let top = ty1.max(0) as usize;
        let bottom = ((ty1 + 1) as usize).min(tiles_y - 1);

        for (x, o) in row.iter_mut().enumerate() {
            let v = src[y * w + x] as usize;
            let (left, right, xa) = columns[x];
            let lut = |ty: usize, tx: usize| luts[ty * tiles_x + tx][v] as f32;
            let res = (lut(top, left) * (1.0 - xa) + lut(top, right) * xa) * (1.0 - ya)
                + (lut(bottom, left) * (1.0 - xa) + lut(bottom, right) * xa) * ya;
            *o = res.round().clamp(0.0, 255.0) as u8;
        }
    });

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| image.clone())
}

/// Clip bins at `clip` and spread the excess uniformly
fn clip_histogram(hist: &mut [usize; BINS], clip: usize) {
    let mut excess = 0usize;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    if excess == 0 {
        return;
    }

    let batch = excess / BINS;
    let mut residual = excess - batch * BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Cumulative histogram scaled to [0, 255]
fn equalization_lut(hist: &[usize; BINS], scale: f32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    let mut sum = 0usize;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
