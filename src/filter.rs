//! Gaussian filtering on single-channel float planes
//!
//! Planes are row-major `Vec<f32>` buffers. Rows are convolved in parallel;
//! every output sample depends only on the input, so results do not depend on
//! scheduling.

use image::{GrayImage, Luma};
use rayon::prelude::*;

/// How samples outside the image are synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// `aaa|abcd|ddd`
    Replicate,
    /// `cb|abcd|cb`
    Reflect101,
}

impl BorderMode {
    /// Map a possibly out-of-range coordinate into `0..len`
    #[inline]
    pub fn index(self, i: isize, len: usize) -> usize {
        let last = len as isize - 1;
        if last <= 0 {
            return 0;
        }
        match self {
            BorderMode::Replicate => i.clamp(0, last) as usize,
            BorderMode::Reflect101 => {
                let mut i = i;
                while i < 0 || i > last {
                    if i < 0 {
                        i = -i;
                    }
                    if i > last {
                        i = 2 * last - i;
                    }
                }
                i as usize
            }
        }
    }
}

/// Kernel size used when only sigma is given
///
/// 8-bit data uses +-3 sigma, float data +-4 sigma.
pub fn kernel_size_for_sigma(sigma: f32, float_data: bool) -> usize {
    let taps = if float_data { 4.0 } else { 3.0 };
    ((sigma * taps * 2.0 + 1.0).round() as usize) | 1
}

/// Generate a normalized 1D Gaussian kernel
pub fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as i32;
    let mut kernel = Vec::with_capacity(size);
    let mut sum = 0.0f32;

    for i in 0..size {
        let x = (i as i32 - half) as f32;
        let g = (-x * x / (2.0 * sigma * sigma)).exp();
        kernel.push(g);
        sum += g;
    }

    for k in &mut kernel {
        *k /= sum;
    }

    kernel
}

/// Separable 2D convolution with the same kernel on both axes
pub fn convolve_separable(
    data: &[f32],
    width: usize,
    height: usize,
    kernel: &[f32],
    border: BorderMode,
) -> Vec<f32> {
    let k_half = (kernel.len() / 2) as isize;

    // Horizontal pass
    let mut temp = vec![0.0f32; width * height];
    temp.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &data[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = border.index(x as isize + ki as isize - k_half, width);
                    sum += src[sx] * kv;
                }
                *out = sum;
            }
        });

    // Vertical pass
    let mut result = vec![0.0f32; width * height];
    result
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = border.index(y as isize + ki as isize - k_half, height);
                let src = &temp[sy * width..(sy + 1) * width];
                for (out, &v) in row.iter_mut().zip(src) {
                    *out += v * kv;
                }
            }
        });

    result
}

/// Gaussian blur of a float plane, kernel sized from sigma
///
/// The kernel never spans more than +-4 times the longest side.
pub fn gaussian_blur(
    data: &[f32],
    width: usize,
    height: usize,
    sigma: f32,
    border: BorderMode,
) -> Vec<f32> {
    let max_size = 8 * width.max(height).max(1) + 1;
    let kernel = gaussian_kernel(kernel_size_for_sigma(sigma, true).min(max_size), sigma);
    convolve_separable(data, width, height, &kernel, border)
}

/// Gaussian blur of an 8-bit image with an explicit kernel size
///
/// A non-positive `sigma` derives it from the kernel size.
pub fn gaussian_blur_gray(image: &GrayImage, size: usize, sigma: f32, border: BorderMode) -> GrayImage {
    let (width, height) = image.dimensions();
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let kernel = gaussian_kernel(size, sigma);
    let plane = to_plane(image);
    let blurred = convolve_separable(&plane, width as usize, height as usize, &kernel, border);
    from_plane_rounded(&blurred, width, height)
}

/// Convert an 8-bit image to a float plane
pub fn to_plane(image: &GrayImage) -> Vec<f32> {
    image.as_raw().iter().map(|&v| v as f32).collect()
}

/// Convert a float plane to 8-bit, rounding and saturating
pub fn from_plane_rounded(plane: &[f32], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let v = plane[(y * width + x) as usize];
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel() {
        let kernel = gaussian_kernel(5, 1.0);

        assert_eq!(kernel.len(), 5);

        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 0.001);

        assert!(kernel[2] > kernel[0]);
        assert!(kernel[2] > kernel[4]);
        assert!((kernel[0] - kernel[4]).abs() < 1e-6);
    }

    #[test]
    fn test_kernel_size_for_sigma() {
        assert_eq!(kernel_size_for_sigma(30.0, true), 241);
        assert_eq!(kernel_size_for_sigma(1.0, false), 7);
        assert_eq!(kernel_size_for_sigma(1.0, true), 9);
    }

    #[test]
    fn test_gaussian_blur_infinite_sigma_stays_finite() {
        let data = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0];
        let blurred = gaussian_blur(&data, 3, 2, f32::INFINITY, BorderMode::Reflect101);
        assert_eq!(blurred.len(), data.len());
        assert!(blurred.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_border_reflect101() {
        let b = BorderMode::Reflect101;
        assert_eq!(b.index(-1, 5), 1);
        assert_eq!(b.index(-2, 5), 2);
        assert_eq!(b.index(5, 5), 3);
        assert_eq!(b.index(6, 5), 2);
        assert_eq!(b.index(2, 5), 2);
        // Far outside a short row still lands inside
        assert!(b.index(-40, 3) < 3);
        assert_eq!(b.index(7, 1), 0);
    }

    #[test]
    fn test_border_replicate() {
        let b = BorderMode::Replicate;
        assert_eq!(b.index(-3, 5), 0);
        assert_eq!(b.index(9, 5), 4);
    }

    #[test]
    fn test_blur_preserves_constant_plane() {
        let plane = vec![178.0f32; 40 * 30];
        let blurred = gaussian_blur(&plane, 40, 30, 5.0, BorderMode::Reflect101);
        assert!(blurred.iter().all(|&v| (v - 178.0).abs() < 1e-2));
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut plane = vec![0.0f32; 21 * 21];
        plane[10 * 21 + 10] = 100.0;
        let blurred = gaussian_blur(&plane, 21, 21, 1.5, BorderMode::Reflect101);

        let total: f32 = blurred.iter().sum();
        assert!((total - 100.0).abs() < 0.5);
        assert!(blurred[10 * 21 + 10] < 100.0);
        assert!(blurred[10 * 21 + 11] > 0.0);
    }

    #[test]
    fn test_gaussian_blur_gray_uniform() {
        let image = GrayImage::from_pixel(16, 16, Luma([90]));
        let blurred = gaussian_blur_gray(&image, 7, 0.0, BorderMode::Replicate);
        assert!(blurred.pixels().all(|p| p.0[0] == 90));
    }
}
