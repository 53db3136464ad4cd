//! 8-bit CIE L*a*b* conversion (sRGB, D65 white)
//!
//! Encoding: `L * 255 / 100`, `a + 128`, `b + 128`, each rounded. Pure white
//! encodes as (255, 128, 128) and decodes back to pure white.

use image::{GrayImage, RgbImage};
use rayon::prelude::*;

// sRGB primaries to XYZ, D65
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

const WHITE_X: f64 = 0.950456;
const WHITE_Z: f64 = 1.088754;

/// CIE epsilon (6/29)^3
const LAB_EPSILON: f64 = 0.008856;
/// CIE kappa for the linear segment
const LAB_KAPPA: f64 = 903.3;

/// Image split into 8-bit encoded L, a and b planes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabPlanes {
    pub l: GrayImage,
    pub a: GrayImage,
    pub b: GrayImage,
}

impl LabPlanes {
    /// Convert an sRGB image
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let encoded: Vec<[u8; 3]> = image
            .as_raw()
            .par_chunks(3)
            .map(|p| rgb_to_lab8([p[0], p[1], p[2]]))
            .collect();

        let plane = |c: usize| {
            GrayImage::from_raw(width, height, encoded.iter().map(|v| v[c]).collect())
                .unwrap_or_else(|| GrayImage::new(width, height))
        };
        Self {
            l: plane(0),
            a: plane(1),
            b: plane(2),
        }
    }

    /// Convert back to sRGB
    pub fn to_rgb(&self) -> RgbImage {
        let (width, height) = self.l.dimensions();
        let mut out = RgbImage::new(width, height);
        out.par_chunks_mut(3)
            .zip(self.l.as_raw().par_iter())
            .zip(self.a.as_raw().par_iter().zip(self.b.as_raw().par_iter()))
            .for_each(|((px, &l), (&a, &b))| {
                px.copy_from_slice(&lab8_to_rgb([l, a, b]));
            });
        out
    }

    /// Image dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        self.l.dimensions()
    }
}

#[inline]
fn srgb_to_linear(v: u8) -> f64 {
    let c = v as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        (LAB_KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f64) -> f64 {
    let t = f * f * f;
    if t > LAB_EPSILON {
        t
    } else {
        (116.0 * f - 16.0) / LAB_KAPPA
    }
}

/// Encode one sRGB pixel as 8-bit Lab
pub fn rgb_to_lab8(rgb: [u8; 3]) -> [u8; 3] {
    let lin = [
        srgb_to_linear(rgb[0]),
        srgb_to_linear(rgb[1]),
        srgb_to_linear(rgb[2]),
    ];
    let xyz: Vec<f64> = RGB_TO_XYZ
        .iter()
        .map(|row| row[0] * lin[0] + row[1] * lin[1] + row[2] * lin[2])
        .collect();

    let fx = lab_f(xyz[0] / WHITE_X);
    let fy = lab_f(xyz[1]);
    let fz = lab_f(xyz[2] / WHITE_Z);

    let l = if xyz[1] > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        LAB_KAPPA * xyz[1]
    };
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (b + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Decode one 8-bit Lab pixel to sRGB
pub fn lab8_to_rgb(lab: [u8; 3]) -> [u8; 3] {
    let l = lab[0] as f64 * 100.0 / 255.0;
    let a = lab[1] as f64 - 128.0;
    let b = lab[2] as f64 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let y = if l > LAB_KAPPA * LAB_EPSILON {
        fy * fy * fy
    } else {
        l / LAB_KAPPA
    };
    let x = lab_f_inv(fy + a / 500.0) * WHITE_X;
    let z = lab_f_inv(fy - b / 200.0) * WHITE_Z;

    let rgb: Vec<u8> = XYZ_TO_RGB
        .iter()
        .map(|row| linear_to_srgb(row[0] * x + row[1] * y + row[2] * z))
        .collect();
    [rgb[0], rgb[1], rgb[2]]
}

/// Convert a whole image to Lab and back through `f` applied to the planes
pub fn map_lab<F>(image: &RgbImage, f: F) -> RgbImage
where
    F: FnOnce(LabPlanes) -> LabPlanes,
{
    f(LabPlanes::from_rgb(image)).to_rgb()
}
