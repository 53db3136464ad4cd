//! Fast marching engine
//!
//! Masked pixels are filled in order of increasing distance `T` from the mask
//! boundary. A min-heap holds the narrow band; each popped pixel freezes and
//! its masked 4-neighbours get a distance from the eikonal solver, a color
//! estimate from the selected weighting, and join the band.
//!
//! Ties in `T` are broken by pixel index, so the fill order (and therefore
//! the output) is fully deterministic.

use image::{GrayImage, RgbImage};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

use super::{navier_stokes, telea};

/// Distance assigned to pixels not reached yet
const UNREACHED: f32 = 1.0e6;

/// Pixel state during marching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flag {
    /// Original or already filled, distance frozen
    Known,
    /// In the narrow band, color available, distance tentative
    Band,
    /// Still to be filled
    Inside,
}

/// Color estimator applied to each newly reached pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InpaintMethod {
    /// Telea weighting: direction, distance and level-set terms
    Telea,
    /// Navier-Stokes style weighting along local isophotes
    NavierStokes,
}

impl InpaintMethod {
    fn estimate(self, state: &MarchState, x: isize, y: isize, range: isize) -> Option<[u8; 3]> {
        match self {
            InpaintMethod::Telea => telea::estimate(state, x, y, range),
            InpaintMethod::NavierStokes => navier_stokes::estimate(state, x, y, range),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BandEntry {
    t: f32,
    index: usize,
}

impl PartialEq for BandEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BandEntry {}

impl PartialOrd for BandEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BandEntry {
    // Reversed so the BinaryHeap pops the smallest distance first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Marching state shared with the weighting estimators
pub(crate) struct MarchState {
    width: usize,
    height: usize,
    flags: Vec<Flag>,
    t: Vec<f32>,
    pixels: Vec<u8>,
}

impl MarchState {
    fn new(image: &RgbImage, mask: &GrayImage) -> Self {
        let flags: Vec<Flag> = mask
            .as_raw()
            .iter()
            .map(|&m| if m != 0 { Flag::Inside } else { Flag::Known })
            .collect();
        let t = flags
            .iter()
            .map(|f| if *f == Flag::Inside { UNREACHED } else { 0.0 })
            .collect();

        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            flags,
            t,
            pixels: image.as_raw().clone(),
        }
    }

    #[inline]
    fn index(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            None
        } else {
            Some(y as usize * self.width + x as usize)
        }
    }

    /// Whether a pixel carries a usable color (known or in the band)
    #[inline]
    pub(crate) fn is_known(&self, x: isize, y: isize) -> bool {
        self.index(x, y)
            .is_some_and(|i| self.flags[i] != Flag::Inside)
    }

    /// Arrival distance, `UNREACHED` outside the image
    #[inline]
    pub(crate) fn distance(&self, x: isize, y: isize) -> f32 {
        self.index(x, y).map_or(UNREACHED, |i| self.t[i])
    }

    /// Channel value of an in-image pixel
    #[inline]
    pub(crate) fn value(&self, x: isize, y: isize, channel: usize) -> f32 {
        self.index(x, y)
            .map_or(0.0, |i| self.pixels[i * 3 + channel] as f32)
    }

    /// Finite difference of `sample` along `(dx, dy)` using known samples only
    ///
    /// Central when both sides are known, one-sided when only one is, zero
    /// otherwise.
    pub(crate) fn known_difference<F>(&self, x: isize, y: isize, dx: isize, dy: isize, sample: F) -> f32
    where
        F: Fn(isize, isize) -> f32,
    {
        let forward = self.is_known(x + dx, y + dy);
        let backward = self.is_known(x - dx, y - dy);
        match (forward, backward) {
            (true, true) => (sample(x + dx, y + dy) - sample(x - dx, y - dy)) * 0.5,
            (true, false) => sample(x + dx, y + dy) - sample(x, y),
            (false, true) => sample(x, y) - sample(x - dx, y - dy),
            (false, false) => 0.0,
        }
    }

    /// Gradient of the distance field at `(x, y)`
    pub(crate) fn distance_gradient(&self, x: isize, y: isize) -> (f32, f32) {
        let sample = |sx, sy| self.distance(sx, sy);
        (
            self.known_difference(x, y, 1, 0, sample),
            self.known_difference(x, y, 0, 1, sample),
        )
    }

    /// Gradient of one color channel at a known pixel
    pub(crate) fn color_gradient(&self, x: isize, y: isize, channel: usize) -> (f32, f32) {
        let sample = |sx, sy| self.value(sx, sy, channel);
        (
            self.known_difference(x, y, 1, 0, sample),
            self.known_difference(x, y, 0, 1, sample),
        )
    }

    /// First-order upwind solution of `|grad T| = 1` from two neighbours
    fn solve(&self, x1: isize, y1: isize, x2: isize, y2: isize) -> f32 {
        let a1 = self.distance(x1, y1);
        let a2 = self.distance(x2, y2);

        match (self.is_known(x1, y1), self.is_known(x2, y2)) {
            (true, true) => {
                if (a1 - a2).abs() >= 1.0 {
                    1.0 + a1.min(a2)
                } else {
                    let r = (2.0 - (a1 - a2) * (a1 - a2)).sqrt();
                    let s = (a1 + a2 - r) * 0.5;
                    if s >= a1 && s >= a2 {
                        s
                    } else if s + r >= a1 && s + r >= a2 {
                        s + r
                    } else {
                        UNREACHED
                    }
                }
            }
            (true, false) => 1.0 + a1,
            (false, true) => 1.0 + a2,
            (false, false) => UNREACHED,
        }
    }

    fn arrival_distance(&self, x: isize, y: isize) -> f32 {
        self.solve(x - 1, y, x, y - 1)
            .min(self.solve(x + 1, y, x, y - 1))
            .min(self.solve(x - 1, y, x, y + 1))
            .min(self.solve(x + 1, y, x, y + 1))
    }
}

/// Fill every nonzero pixel of `mask` in `image`
///
/// Pixels where the mask is zero are never written. `radius` is rounded to the
/// nearest whole pixel, at least 1 and at most the longest image side.
pub fn march(image: &RgbImage, mask: &GrayImage, radius: f32, method: InpaintMethod) -> RgbImage {
    let mut state = MarchState::new(image, mask);
    let longest = image.width().max(image.height()).max(1) as isize;
    let range = (radius.round() as isize).clamp(1, longest);
    let filled = run(&mut state, range, method);
    debug!(filled, ?method, range, "fast marching finished");

    RgbImage::from_raw(image.width(), image.height(), state.pixels)
        .unwrap_or_else(|| image.clone())
}

const NEIGHBOURS: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// March until the band is exhausted, returning the number of filled pixels
fn run(state: &mut MarchState, range: isize, method: InpaintMethod) -> usize {
    let (width, height) = (state.width as isize, state.height as isize);

    // Initial band: known pixels touching the masked region
    let mut heap = BinaryHeap::new();
    for y in 0..height {
        for x in 0..width {
            let Some(i) = state.index(x, y) else { continue };
            if state.flags[i] != Flag::Known {
                continue;
            }
            let touches_inside = NEIGHBOURS.iter().any(|&(dx, dy)| {
                state
                    .index(x + dx, y + dy)
                    .is_some_and(|n| state.flags[n] == Flag::Inside)
            });
            if touches_inside {
                state.flags[i] = Flag::Band;
                heap.push(BandEntry { t: 0.0, index: i });
            }
        }
    }

    let mut filled = 0usize;
    while let Some(BandEntry { index, .. }) = heap.pop() {
        if state.flags[index] == Flag::Known {
            continue;
        }
        state.flags[index] = Flag::Known;
        let (px, py) = ((index % state.width) as isize, (index / state.width) as isize);

        for (dx, dy) in NEIGHBOURS {
            let (x, y) = (px + dx, py + dy);
            let Some(n) = state.index(x, y) else { continue };
            if state.flags[n] != Flag::Inside {
                continue;
            }

            let t = state.arrival_distance(x, y);
            state.t[n] = t;
            if let Some(color) = method.estimate(state, x, y, range) {
                state.pixels[n * 3..n * 3 + 3].copy_from_slice(&color);
            }
            state.flags[n] = Flag::Band;
            heap.push(BandEntry { t, index: n });
            filled += 1;
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_band_entry_pops_smallest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(BandEntry { t: 2.5, index: 0 });
        heap.push(BandEntry { t: 0.5, index: 7 });
        heap.push(BandEntry { t: 0.5, index: 3 });
        heap.push(BandEntry { t: 1.0, index: 1 });

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|e| e.index)).collect();
        assert_eq!(order, vec![3, 7, 1, 0]);
    }

    #[test]
    fn test_distance_grows_inward() {
        let image = RgbImage::from_pixel(21, 21, Rgb([100, 100, 100]));
        let mut mask = GrayImage::new(21, 21);
        for y in 5..16 {
            for x in 5..16 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let mut state = MarchState::new(&image, &mask);
        assert!(!state.is_known(10, 10));
        assert!(state.is_known(0, 0));
        assert!(!state.is_known(-1, 0));

        let filled = run(&mut state, 2, InpaintMethod::Telea);
        assert_eq!(filled, 121);
        assert!(state.flags.iter().all(|f| *f == Flag::Known));
        assert_eq!(state.distance(0, 0), 0.0);
        assert!(state.distance(5, 10) > 0.0);
        assert!(state.distance(7, 10) > state.distance(5, 10));
        assert!(state.distance(10, 10) > state.distance(7, 10));
        assert!(state.distance(10, 10) < 10.0);
    }

    #[test]
    fn test_solve_single_known_neighbour() {
        let image = RgbImage::new(3, 1);
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(1, 0, Luma([255]));
        mask.put_pixel(2, 0, Luma([255]));
        let state = MarchState::new(&image, &mask);

        assert_eq!(state.arrival_distance(1, 0), 1.0);
    }

    #[test]
    fn test_solve_two_known_neighbours() {
        let image = RgbImage::new(2, 2);
        let mut mask = GrayImage::new(2, 2);
        mask.put_pixel(1, 1, Luma([255]));
        let state = MarchState::new(&image, &mask);

        // Both upwind neighbours at distance 0: (0 + 0 + sqrt(2)) / 2
        let t = state.arrival_distance(1, 1);
        assert!((t - std::f32::consts::SQRT_2 / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_known_difference() {
        let image = RgbImage::from_fn(5, 1, |x, _| Rgb([(x * 10) as u8, 0, 0]));
        let mut mask = GrayImage::new(5, 1);
        mask.put_pixel(4, 0, Luma([255]));
        let state = MarchState::new(&image, &mask);

        // Central difference in the middle, one-sided next to the masked pixel
        assert_eq!(state.color_gradient(2, 0, 0), (10.0, 0.0));
        assert_eq!(state.color_gradient(3, 0, 0), (10.0, 0.0));
        assert_eq!(state.color_gradient(0, 0, 0), (10.0, 0.0));
    }

    #[test]
    fn test_march_fills_uniform_surroundings() {
        let mut image = RgbImage::from_pixel(30, 30, Rgb([120, 80, 60]));
        let mut mask = GrayImage::new(30, 30);
        for i in 3..27 {
            image.put_pixel(i, i, Rgb([0, 0, 0]));
            mask.put_pixel(i, i, Luma([255]));
        }

        for method in [InpaintMethod::Telea, InpaintMethod::NavierStokes] {
            let out = march(&image, &mask, 3.0, method);
            assert!(out.pixels().all(|p| *p == Rgb([120, 80, 60])), "{:?}", method);
        }
    }

    #[test]
    fn test_march_without_mask_is_identity() {
        let image = RgbImage::from_fn(12, 9, |x, y| Rgb([x as u8 * 9, y as u8 * 20, 7]));
        let mask = GrayImage::new(12, 9);
        assert_eq!(march(&image, &mask, 3.0, InpaintMethod::Telea), image);
    }

    #[test]
    fn test_march_fully_masked_keeps_input() {
        let image = RgbImage::from_pixel(6, 6, Rgb([9, 9, 9]));
        let mask = GrayImage::from_pixel(6, 6, Luma([255]));
        assert_eq!(march(&image, &mask, 3.0, InpaintMethod::NavierStokes), image);
    }

    #[test]
    fn test_march_radius_capped_at_image_size() {
        let mut image = RgbImage::from_pixel(16, 16, Rgb([120, 80, 60]));
        let mut mask = GrayImage::new(16, 16);
        for x in 2..14 {
            image.put_pixel(x, 8, Rgb([0, 0, 0]));
            mask.put_pixel(x, 8, Luma([255]));
        }

        let reference = march(&image, &mask, 16.0, InpaintMethod::Telea);
        for radius in [f32::INFINITY, 1.0e12] {
            assert_eq!(march(&image, &mask, radius, InpaintMethod::Telea), reference);
        }
        assert!(reference.pixels().all(|p| *p == Rgb([120, 80, 60])));
    }
}
