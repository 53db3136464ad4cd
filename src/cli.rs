//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    CliOverrides, InpaintMode, ThresholdMode, DEFAULT_ADAPTIVE_BLOCK_SIZE,
    DEFAULT_BRIGHTENING_FACTOR, DEFAULT_FFC_SIGMA, DEFAULT_INPAINTING_RADIUS,
    DEFAULT_TOPHAT_RADIUS, DEFAULT_WORKING_SIZE,
};

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_NOT_FOUND: i32 = 2;
    pub const INVALID_CONFIG: i32 = 3;
    pub const PROCESSING_ERROR: i32 = 4;
}

/// Hair artifact removal for dermoscopic images
#[derive(Parser, Debug)]
#[command(name = "dehair")]
#[command(version, about = "Hair artifact removal for dermoscopic images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove hair from an image
    Remove(RemoveArgs),
    /// Show system information and the effective default configuration
    Info,
}

/// Arguments for the remove command
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Input image (any format the decoder understands)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output image path [default: <INPUT stem>_clean.png next to the input]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write the final hair mask
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Also write run statistics as JSON
    #[arg(long, value_name = "FILE")]
    pub stats: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Square working resolution in pixels
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_WORKING_SIZE.0)]
    pub size: u32,

    /// Top-hat structuring element radius
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_TOPHAT_RADIUS)]
    pub tophat_radius: u32,

    /// Brightening factor (0.0-1.0)
    #[arg(long, value_name = "FLOAT", default_value_t = DEFAULT_BRIGHTENING_FACTOR)]
    pub brightening: f32,

    /// Flat-field correction sigma
    #[arg(long, value_name = "FLOAT", default_value_t = DEFAULT_FFC_SIGMA)]
    pub ffc_sigma: f32,

    /// Use adaptive thresholding instead of Otsu
    #[arg(long)]
    pub adaptive: bool,

    /// Block size for adaptive thresholding (odd)
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_ADAPTIVE_BLOCK_SIZE)]
    pub block_size: u32,

    /// Detect on the red channel only
    #[arg(long)]
    pub single_channel: bool,

    /// Single Telea pass instead of the blended careful mode
    #[arg(long)]
    pub fast_inpaint: bool,

    /// Radius for fast inpainting
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_INPAINTING_RADIUS)]
    pub inpaint_radius: f32,

    /// Skip the selective denoise step
    #[arg(long)]
    pub no_details: bool,

    /// Number of worker threads [default: all cores]
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress and summary output
    #[arg(short, long)]
    pub quiet: bool,
}

impl RemoveArgs {
    /// Output path, derived from the input when not given
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.input.with_file_name(format!("{}_clean.png", stem))
    }

    /// Overrides for values the user changed from their CLI defaults
    ///
    /// Values left at their defaults do not override the config file.
    pub fn to_overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides::new();

        if self.size != DEFAULT_WORKING_SIZE.0 {
            overrides.working_size = Some(self.size);
        }
        if self.tophat_radius != DEFAULT_TOPHAT_RADIUS {
            overrides.tophat_radius = Some(self.tophat_radius);
        }
        if (self.brightening - DEFAULT_BRIGHTENING_FACTOR).abs() > f32::EPSILON {
            overrides.brightening_factor = Some(self.brightening);
        }
        if (self.ffc_sigma - DEFAULT_FFC_SIGMA).abs() > f32::EPSILON {
            overrides.ffc_sigma = Some(self.ffc_sigma);
        }
        if self.adaptive {
            overrides.threshold_mode = Some(ThresholdMode::Adaptive);
        }
        if self.block_size != DEFAULT_ADAPTIVE_BLOCK_SIZE {
            overrides.adaptive_block_size = Some(self.block_size);
        }
        if self.single_channel {
            overrides.multi_channel = Some(false);
        }
        if self.fast_inpaint {
            overrides.inpaint_mode = Some(InpaintMode::Fast);
        }
        if (self.inpaint_radius - DEFAULT_INPAINTING_RADIUS).abs() > f32::EPSILON {
            overrides.inpainting_radius = Some(self.inpaint_radius);
        }
        if self.no_details {
            overrides.preserve_details = Some(false);
        }

        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_remove(args: &[&str]) -> RemoveArgs {
        let mut argv = vec!["dehair", "remove"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Remove(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_remove_defaults() {
        let args = parse_remove(&["lesion.jpg"]);
        assert_eq!(args.input, PathBuf::from("lesion.jpg"));
        assert_eq!(args.size, 720);
        assert_eq!(args.tophat_radius, 18);
        assert!(!args.adaptive);
        assert!(!args.fast_inpaint);
        assert_eq!(args.verbose, 0);
        assert!(args.threads.is_none());
    }

    #[test]
    fn test_defaults_produce_no_overrides() {
        let args = parse_remove(&["lesion.jpg"]);
        assert_eq!(args.to_overrides(), CliOverrides::new());
    }

    #[test]
    fn test_overrides_from_flags() {
        let args = parse_remove(&[
            "lesion.jpg",
            "--size",
            "512",
            "--adaptive",
            "--block-size",
            "21",
            "--single-channel",
            "--fast-inpaint",
            "--no-details",
            "--brightening",
            "0.5",
        ]);
        let overrides = args.to_overrides();
        assert_eq!(overrides.working_size, Some(512));
        assert_eq!(overrides.threshold_mode, Some(ThresholdMode::Adaptive));
        assert_eq!(overrides.adaptive_block_size, Some(21));
        assert_eq!(overrides.multi_channel, Some(false));
        assert_eq!(overrides.inpaint_mode, Some(InpaintMode::Fast));
        assert_eq!(overrides.preserve_details, Some(false));
        assert_eq!(overrides.brightening_factor, Some(0.5));
        assert!(overrides.tophat_radius.is_none());
    }

    #[test]
    fn test_output_path() {
        let args = parse_remove(&["/data/ISIC_001.jpg"]);
        assert_eq!(args.output_path(), PathBuf::from("/data/ISIC_001_clean.png"));

        let args = parse_remove(&["/data/ISIC_001.jpg", "-o", "out.png"]);
        assert_eq!(args.output_path(), PathBuf::from("out.png"));
    }

    #[test]
    fn test_verbose_count() {
        let args = parse_remove(&["a.png", "-vv", "-j", "4"]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.threads, Some(4));
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::try_parse_from(["dehair", "info"]).unwrap();
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_missing_input_rejected() {
        assert!(Cli::try_parse_from(["dehair", "remove"]).is_err());
    }

    #[test]
    fn test_exit_codes_distinct() {
        let codes = [
            exit_codes::SUCCESS,
            exit_codes::GENERAL_ERROR,
            exit_codes::INPUT_NOT_FOUND,
            exit_codes::INVALID_CONFIG,
            exit_codes::PROCESSING_ERROR,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
