//! Unsharp mask sharpening

use image::RgbImage;

use crate::filter::{convolve_separable, gaussian_kernel, kernel_size_for_sigma, BorderMode};

/// Unsharp mask parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpOptions {
    /// Sigma of the Gaussian blur
    pub sigma: f32,

    /// How much of the detail layer is added back
    pub amount: f32,
}

impl Default for UnsharpOptions {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            amount: 0.3,
        }
    }
}

/// Apply unsharp mask sharpening
///
/// `result = (1 + amount) * original - amount * blur`, rounded and clamped.
pub fn unsharp_mask(image: &RgbImage, options: &UnsharpOptions) -> RgbImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return image.clone();
    }

    let kernel = gaussian_kernel(kernel_size_for_sigma(options.sigma, false), options.sigma);
    let mut out = image.clone();

    for channel in 0..3 {
        let original: Vec<f32> = image.pixels().map(|p| p.0[channel] as f32).collect();
        let blurred = convolve_separable(&original, w, h, &kernel, BorderMode::Reflect101);

        for (i, pixel) in out.pixels_mut().enumerate() {
            let sharpened = (1.0 + options.amount) * original[i] - options.amount * blurred[i];
            pixel.0[channel] = sharpened.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}
