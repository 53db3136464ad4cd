//! Channel fusion into a single hairness map

use image::{GrayImage, RgbImage};
use imageproc::map::{blue_channel, green_channel, red_channel};
use rayon::prelude::*;
use tracing::{debug_span, instrument};

use super::channel::{process_channel, ChannelParams};

/// Color channel of an RGB raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl ColorChannel {
    /// All channels in RGB order
    pub fn all() -> [ColorChannel; 3] {
        [ColorChannel::Red, ColorChannel::Green, ColorChannel::Blue]
    }

    /// Channel name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ColorChannel::Red => "Red",
            ColorChannel::Green => "Green",
            ColorChannel::Blue => "Blue",
        }
    }

    /// Extract this channel as a grayscale raster
    pub fn extract(&self, image: &RgbImage) -> GrayImage {
        match self {
            ColorChannel::Red => red_channel(image),
            ColorChannel::Green => green_channel(image),
            ColorChannel::Blue => blue_channel(image),
        }
    }
}

/// Enhance one channel of `image`
pub fn enhance_color_channel(
    image: &RgbImage,
    channel: ColorChannel,
    params: &ChannelParams,
) -> GrayImage {
    let _span = debug_span!("channel", name = channel.name()).entered();
    process_channel(&channel.extract(image), params)
}

/// Per-pixel maximum of two maps of equal size
pub fn max_merge(mut a: GrayImage, b: GrayImage) -> GrayImage {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x = (*x).max(*y);
    }
    a
}

/// Enhance the given channels independently and fuse them with a per-pixel max
///
/// Channels run as parallel tasks; the max reduction is commutative and
/// associative, so the fused map does not depend on completion order or on
/// the order of `channels`. Returns `None` for an empty channel list.
pub fn fuse_channels(
    image: &RgbImage,
    channels: &[ColorChannel],
    params: &ChannelParams,
) -> Option<GrayImage> {
    channels
        .par_iter()
        .map(|&channel| enhance_color_channel(image, channel, params))
        .reduce_with(max_merge)
}

/// Build the hairness map: fused R/G/B, or red only in single-channel mode
#[instrument(skip_all, fields(multi_channel = multi_channel))]
pub fn enhance_image(image: &RgbImage, params: &ChannelParams, multi_channel: bool) -> GrayImage {
    if multi_channel {
        fuse_channels(image, &ColorChannel::all(), params)
            .unwrap_or_else(|| enhance_color_channel(image, ColorChannel::Red, params))
    } else {
        enhance_color_channel(image, ColorChannel::Red, params)
    }
}
