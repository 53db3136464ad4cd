//! Resizing to the working resolution
//!
//! Shrinking uses area averaging: every destination pixel is the
//! coverage-weighted mean of the source pixels under its footprint, which
//! avoids aliasing fine photographic detail. Enlarging falls back to bilinear
//! interpolation. The aspect ratio is not preserved.

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use crate::types::{HairRemovalError, Result};

/// Source taps contributing to one destination coordinate
type AreaTaps = Vec<(usize, f32)>;

/// Resize `image` to exactly `width` x `height`
pub fn resize_to_working(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(HairRemovalError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            src_w, src_h
        )));
    }
    if width == 0 || height == 0 {
        return Err(HairRemovalError::InvalidImage(format!(
            "target size must be non-zero, got {}x{}",
            width, height
        )));
    }

    if (src_w, src_h) == (width, height) {
        return Ok(image.clone());
    }

    if width > src_w || height > src_h {
        debug!(src_w, src_h, width, height, "enlarging with bilinear filter");
        return Ok(imageops::resize(image, width, height, FilterType::Triangle));
    }

    debug!(src_w, src_h, width, height, "shrinking with area averaging");
    Ok(resize_area(image, width, height))
}

/// Coverage weights along one axis
fn area_taps(src_len: usize, dst_len: usize) -> Vec<AreaTaps> {
    let scale = src_len as f64 / dst_len as f64;

    (0..dst_len)
        .map(|d| {
            let fs1 = d as f64 * scale;
            let fs2 = fs1 + scale;
            let s1 = fs1.ceil() as usize;
            let s2 = (fs2.floor() as usize).min(src_len);
            let cell = scale.min(src_len as f64 - fs1);

            let mut taps = Vec::with_capacity(scale.ceil() as usize + 2);
            if s1 as f64 - fs1 > 1e-3 && s1 > 0 {
                taps.push((s1 - 1, ((s1 as f64 - fs1) / cell) as f32));
            }
            for s in s1..s2 {
                taps.push((s, (1.0 / cell) as f32));
            }
            if fs2 - s2 as f64 > 1e-3 && s2 < src_len {
                let part = (fs2 - s2 as f64).min(1.0).min(cell);
                taps.push((s2, (part / cell) as f32));
            }
            taps
        })
        .collect()
}

fn resize_area(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let x_taps = area_taps(src_w as usize, width as usize);
    let y_taps = area_taps(src_h as usize, height as usize);
    let src = image.as_raw();
    let dst_w = width as usize;

    // Horizontal pass into a float buffer of src_h rows
    let mut rows = vec![0.0f32; src_h as usize * dst_w * 3];
    for y in 0..src_h as usize {
        let src_row = &src[y * src_w as usize * 3..(y + 1) * src_w as usize * 3];
        let out_row = &mut rows[y * dst_w * 3..(y + 1) * dst_w * 3];
        for (x, taps) in x_taps.iter().enumerate() {
            for &(sx, wgt) in taps {
                for c in 0..3 {
                    out_row[x * 3 + c] += src_row[sx * 3 + c] as f32 * wgt;
                }
            }
        }
    }

    // Vertical pass
    let mut out = RgbImage::new(width, height);
    for (y, taps) in y_taps.iter().enumerate() {
        let mut acc = vec![0.0f32; dst_w * 3];
        for &(sy, wgt) in taps {
            let row = &rows[sy * dst_w * 3..(sy + 1) * dst_w * 3];
            for (a, &v) in acc.iter_mut().zip(row) {
                *a += v * wgt;
            }
        }
        for x in 0..dst_w {
            let px = out.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                px.0[c] = acc[x * 3 + c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}
