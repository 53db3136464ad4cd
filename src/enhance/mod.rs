//! Hair enhancement module
//!
//! Turns an RGB raster into a single-channel "hairness" map.
//!
//! # Algorithm
//!
//! For each color channel:
//!
//! 1. Black top-hat (closing minus original) with an elliptical element.
//!    Closing erases thin dark strands; the difference recovers them.
//! 2. Brightening toward white to lift faint responses
//! 3. Flat-field correction against a wide Gaussian illumination estimate
//!
//! The three channel maps are fused with a per-pixel maximum, since a strand
//! may only stand out in one channel.

mod channel;
mod fuse;

pub use channel::{brighten, flat_field_correct, process_channel, ChannelParams};
pub use fuse::{enhance_color_channel, enhance_image, fuse_channels, max_merge, ColorChannel};
