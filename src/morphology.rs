//! Grayscale and binary morphology with arbitrary row-convex elements
//!
//! # Algorithm
//!
//! A structuring element is stored as one horizontal span per row. Each
//! distinct span is evaluated once per image row with the van Herk/Gil-Werman
//! running extreme (three comparisons per pixel regardless of span length),
//! then the rows of the element are combined vertically. Samples outside the
//! image never contribute: dilation treats them as 0 and erosion as 255.
//!
//! Binary masks (0/255) go through the same code path.

use image::GrayImage;
use rayon::prelude::*;
use std::collections::HashMap;

/// Horizontal run of an element row, offsets relative to the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Span {
    dy: i32,
    x_start: i32,
    x_end: i32,
}

/// Structuring element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    spans: Vec<Span>,
}

impl StructuringElement {
    /// Elliptical element inscribed in a `width` x `height` box
    ///
    /// Row `i` covers `c +- round(c * sqrt(1 - dy^2 / r^2))` with `r = height/2`
    /// and `c = width/2`. A 3x3 ellipse is a cross.
    pub fn ellipse(width: u32, height: u32) -> Self {
        let width = width.max(1) as i32;
        let height = height.max(1) as i32;
        let r = height / 2;
        let c = width / 2;
        let inv_r2 = if r > 0 { 1.0 / (r as f64 * r as f64) } else { 0.0 };

        let mut spans = Vec::with_capacity(height as usize);
        for i in 0..height {
            let dy = i - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(width);
            if j2 > j1 {
                spans.push(Span {
                    dy,
                    x_start: j1 - c,
                    x_end: j2 - 1 - c,
                });
            }
        }

        Self {
            width: width as u32,
            height: height as u32,
            spans,
        }
    }

    /// Disk of the given radius (diameter `2 * radius + 1`)
    pub fn disk(radius: u32) -> Self {
        Self::ellipse(2 * radius + 1, 2 * radius + 1)
    }

    /// Full rectangle, anchored at its center
    pub fn rect(width: u32, height: u32) -> Self {
        let width = width.max(1) as i32;
        let height = height.max(1) as i32;
        let c = width / 2;
        let r = height / 2;
        let spans = (0..height)
            .map(|i| Span {
                dy: i - r,
                x_start: -c,
                x_end: width - 1 - c,
            })
            .collect();

        Self {
            width: width as u32,
            height: height as u32,
            spans,
        }
    }

    /// Bounding box size
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels in the element
    pub fn area(&self) -> usize {
        self.spans
            .iter()
            .map(|s| (s.x_end - s.x_start + 1) as usize)
            .sum()
    }

    /// Whether the offset `(dx, dy)` from the anchor is part of the element
    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        self.spans
            .iter()
            .any(|s| s.dy == dy && dx >= s.x_start && dx <= s.x_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MorphOp {
    Dilate,
    Erode,
}

impl MorphOp {
    #[inline]
    fn identity(self) -> u8 {
        match self {
            MorphOp::Dilate => 0,
            MorphOp::Erode => 255,
        }
    }

    #[inline]
    fn combine(self, a: u8, b: u8) -> u8 {
        match self {
            MorphOp::Dilate => a.max(b),
            MorphOp::Erode => a.min(b),
        }
    }
}

/// Running extreme over `src[x + x_start ..= x + x_end]` for every `x`
fn row_extreme(src: &[u8], x_start: i32, x_end: i32, op: MorphOp, out: &mut [u8]) {
    let n = src.len();
    let k = (x_end - x_start + 1) as usize;
    let pad = k + x_start.unsigned_abs() as usize + x_end.unsigned_abs() as usize;
    let len = n + 2 * pad;
    let identity = op.identity();

    let mut padded = vec![identity; len];
    padded[pad..pad + n].copy_from_slice(src);

    // Prefix extremes within blocks of k, and suffix extremes within the same blocks
    let mut prefix = vec![identity; len];
    let mut suffix = vec![identity; len];
    for i in 0..len {
        prefix[i] = if i % k == 0 {
            padded[i]
        } else {
            op.combine(prefix[i - 1], padded[i])
        };
    }
    for i in (0..len).rev() {
        suffix[i] = if i % k == k - 1 || i == len - 1 {
            padded[i]
        } else {
            op.combine(suffix[i + 1], padded[i])
        };
    }

    for (x, o) in out.iter_mut().enumerate() {
        let s = (pad as isize + x as isize + x_start as isize) as usize;
        *o = op.combine(suffix[s], prefix[s + k - 1]);
    }
}

fn apply(image: &GrayImage, element: &StructuringElement, op: MorphOp) -> GrayImage {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;
    if w == 0 || h == 0 {
        return image.clone();
    }
    let src = image.as_raw();

    // One horizontal pass per distinct span shape
    let mut shapes: Vec<(i32, i32)> = element.spans.iter().map(|s| (s.x_start, s.x_end)).collect();
    shapes.sort_unstable();
    shapes.dedup();

    let horizontal: HashMap<(i32, i32), Vec<u8>> = shapes
        .par_iter()
        .map(|&(x_start, x_end)| {
            let mut plane = vec![0u8; w * h];
            for (row_out, row_in) in plane.chunks_mut(w).zip(src.chunks(w)) {
                row_extreme(row_in, x_start, x_end, op, row_out);
            }
            ((x_start, x_end), plane)
        })
        .collect();

    let mut out = vec![op.identity(); w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for span in &element.spans {
            let sy = y as i64 + span.dy as i64;
            if sy < 0 || sy >= h as i64 {
                continue;
            }
            let plane = &horizontal[&(span.x_start, span.x_end)];
            let src_row = &plane[sy as usize * w..(sy as usize + 1) * w];
            for (o, &v) in row.iter_mut().zip(src_row) {
                *o = op.combine(*o, v);
            }
        }
    });

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| image.clone())
}

/// Maximum over the element neighbourhood
pub fn dilate(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    apply(image, element, MorphOp::Dilate)
}

/// Minimum over the element neighbourhood
pub fn erode(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    apply(image, element, MorphOp::Erode)
}

/// Erosion followed by dilation (removes small bright features)
pub fn open(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(image, element), element)
}

/// Dilation followed by erosion (fills small dark features)
pub fn close(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(image, element), element)
}

/// Black top-hat: `close(image) - image`, saturating at 0
///
/// Isolates dark structures narrower than the element.
pub fn black_tophat(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    let mut closed = close(image, element);
    for (c, o) in closed.iter_mut().zip(image.as_raw()) {
        *c = c.saturating_sub(*o);
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Brute force reference for comparison
    fn naive(image: &GrayImage, element: &StructuringElement, op: MorphOp) -> GrayImage {
        let (w, h) = image.dimensions();
        GrayImage::from_fn(w, h, |x, y| {
            let mut acc = op.identity();
            for span in &element.spans {
                for dx in span.x_start..=span.x_end {
                    let sx = x as i32 + dx;
                    let sy = y as i32 + span.dy;
                    if sx >= 0 && sy >= 0 && sx < w as i32 && sy < h as i32 {
                        acc = op.combine(acc, image.get_pixel(sx as u32, sy as u32).0[0]);
                    }
                }
            }
            Luma([acc])
        })
    }

    fn pattern(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 37 + y * 91 + x * y * 13) % 256) as u8]))
    }

    #[test]
    fn test_ellipse_3x3_is_cross() {
        let se = StructuringElement::ellipse(3, 3);
        assert_eq!(se.area(), 5);
        assert!(se.contains(0, 0));
        assert!(se.contains(1, 0));
        assert!(se.contains(-1, 0));
        assert!(se.contains(0, 1));
        assert!(se.contains(0, -1));
        assert!(!se.contains(1, 1));
        assert!(!se.contains(-1, -1));
    }

    #[test]
    fn test_disk_shape() {
        let se = StructuringElement::disk(18);
        assert_eq!(se.dimensions(), (37, 37));
        // Widest at the center row, single pixel at the poles
        assert!(se.contains(-18, 0));
        assert!(se.contains(18, 0));
        assert!(se.contains(0, -18));
        assert!(!se.contains(1, -18));
        assert!(!se.contains(18, 18));
        // Symmetric
        for dy in -18..=18 {
            for dx in -18..=18 {
                assert_eq!(se.contains(dx, dy), se.contains(-dx, -dy));
            }
        }
    }

    #[test]
    fn test_rect_area() {
        let se = StructuringElement::rect(5, 5);
        assert_eq!(se.area(), 25);
        assert!(se.contains(2, 2));
        assert!(se.contains(-2, -2));
    }

    #[test]
    fn test_dilate_erode_match_naive() {
        let image = pattern(23, 17);
        for se in [
            StructuringElement::ellipse(3, 3),
            StructuringElement::disk(4),
            StructuringElement::rect(5, 3),
            StructuringElement::ellipse(7, 3),
        ] {
            assert_eq!(dilate(&image, &se), naive(&image, &se, MorphOp::Dilate));
            assert_eq!(erode(&image, &se), naive(&image, &se, MorphOp::Erode));
        }
    }

    #[test]
    fn test_black_tophat_isolates_thin_dark_line() {
        let mut image = GrayImage::from_pixel(60, 60, Luma([200]));
        for x in 0..60 {
            image.put_pixel(x, 30, Luma([50]));
        }

        let tophat = black_tophat(&image, &StructuringElement::disk(5));
        assert_eq!(tophat.get_pixel(10, 30).0[0], 150);
        assert_eq!(tophat.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn test_black_tophat_uniform_is_zero() {
        let image = GrayImage::from_pixel(40, 40, Luma([255]));
        let tophat = black_tophat(&image, &StructuringElement::disk(18));
        assert!(tophat.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_open_removes_isolated_pixel() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(5, 5, Luma([255]));
        for y in 10..16 {
            for x in 10..16 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let opened = open(&mask, &StructuringElement::ellipse(3, 3));
        assert_eq!(opened.get_pixel(5, 5).0[0], 0);
        assert_eq!(opened.get_pixel(12, 12).0[0], 255);
    }

    #[test]
    fn test_border_does_not_erode() {
        let mask = GrayImage::from_pixel(8, 8, Luma([255]));
        let eroded = erode(&mask, &StructuringElement::rect(5, 5));
        assert!(eroded.pixels().all(|p| p.0[0] == 255));
    }
}
