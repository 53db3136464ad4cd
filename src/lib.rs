//! dehair - Hair artifact removal for dermoscopic images
//!
//! Detects hair strands in skin lesion photographs with morphological
//! top-hat filtering, builds a binary hair mask and reconstructs the
//! covered skin by fast marching inpainting.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dehair::{HairRemovalConfig, HairRemover};
//!
//! let image = image::open("lesion.jpg").unwrap().to_rgb8();
//! let remover = HairRemover::new(HairRemovalConfig::default());
//! let output = remover.remove_hairs(&image, None).unwrap();
//!
//! println!("PSNR: {:.2} dB", output.stats.psnr);
//! output.image.save("lesion_clean.png").unwrap();
//! ```
//!
//! # Modules
//!
//! - [`enhance`]: per-channel top-hat enhancement and channel fusion
//! - [`mask`]: thresholding and morphological cleaning
//! - [`inpaint`]: Telea and Navier-Stokes fast marching reconstruction
//! - [`restore`]: selective denoise, CLAHE and unsharp sharpening
//! - [`pipeline`]: the end-to-end entry point
//! - [`metrics`]: coverage and PSNR statistics

pub mod cli;
pub mod config;
pub mod enhance;
pub mod filter;
pub mod inpaint;
pub mod mask;
pub mod metrics;
pub mod morphology;
pub mod pipeline;
pub mod progress;
pub mod resize;
pub mod restore;
pub mod types;

// CLI exports
pub use cli::{exit_codes, Cli, Commands, RemoveArgs};

// Config exports
pub use config::{CliOverrides, ConfigError, HairRemovalConfig, InpaintMode, ThresholdMode};

// Error exports
pub use types::{HairRemovalError, Result};

// Stage exports
pub use enhance::{enhance_image, ChannelParams, ColorChannel};
pub use inpaint::{inpaint, InpaintMethod, Inpainter};
pub use mask::{apply_threshold, MaskCleaner};
pub use restore::{restore_details, RestoreOptions};

// Pipeline exports
pub use metrics::PipelineStats;
pub use pipeline::{remove_hairs, HairRemovalOutput, HairRemover};
pub use progress::{Checkpoint, NoopProgress, ProgressCallback};
