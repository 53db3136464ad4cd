//! Pipeline configuration
//!
//! [`HairRemovalConfig`] is an immutable value handed to the pipeline entry
//! point. It can be built in code, loaded from a TOML file, and patched with
//! command-line overrides.
//!
//! ```toml
//! working_size = [720, 720]
//! tophat_radius = 18
//! threshold_mode = "adaptive"
//! inpaint_mode = "fast"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Default working resolution (width, height)
pub const DEFAULT_WORKING_SIZE: (u32, u32) = (720, 720);

/// Default top-hat structuring element radius
pub const DEFAULT_TOPHAT_RADIUS: u32 = 18;

/// Default fraction by which the top-hat response is pushed toward white
pub const DEFAULT_BRIGHTENING_FACTOR: f32 = 0.7;

/// Default flat-field illumination sigma
pub const DEFAULT_FFC_SIGMA: f32 = 30.0;

/// Default neighbourhood for adaptive thresholding
pub const DEFAULT_ADAPTIVE_BLOCK_SIZE: u32 = 35;

/// Default radius for the single fast inpainting mode
pub const DEFAULT_INPAINTING_RADIUS: f32 = 3.0;

/// Components smaller than this are treated as noise
pub const DEFAULT_MIN_COMPONENT_AREA: u32 = 10;

/// Config file name inside the user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory inside the user config directory
const CONFIG_DIR_NAME: &str = "dehair";

// ============================================================
// Errors
// ============================================================

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

// ============================================================
// Types
// ============================================================

/// Binarization strategy for the fused enhancement map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Global Otsu threshold
    #[default]
    Otsu,

    /// Local Gaussian-weighted mean threshold
    Adaptive,
}

/// Inpainting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InpaintMode {
    /// Telea (radius 2) and Navier-Stokes (radius 3) blended 0.5/0.5
    #[default]
    Careful,

    /// Telea only, using `inpainting_radius`
    Fast,
}

/// Hair removal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HairRemovalConfig {
    /// Working resolution (width, height) all stages run at
    pub working_size: (u32, u32),

    /// Radius of the elliptical top-hat structuring element
    pub tophat_radius: u32,

    /// Fraction of the remaining headroom added during brightening
    pub brightening_factor: f32,

    /// Gaussian sigma of the estimated illumination field
    pub ffc_sigma: f32,

    /// Thresholding strategy
    pub threshold_mode: ThresholdMode,

    /// Block size for adaptive thresholding (odd, >= 3)
    pub adaptive_block_size: u32,

    /// Fuse R, G and B enhancement maps instead of using red only
    pub multi_channel: bool,

    /// Inpainting strategy
    pub inpaint_mode: InpaintMode,

    /// Radius used by [`InpaintMode::Fast`]
    pub inpainting_radius: f32,

    /// Selectively denoise the inpainted neighbourhood
    pub preserve_details: bool,

    /// Minimum connected component area kept in the final mask
    pub min_component_area: u32,
}

impl Default for HairRemovalConfig {
    fn default() -> Self {
        Self {
            working_size: DEFAULT_WORKING_SIZE,
            tophat_radius: DEFAULT_TOPHAT_RADIUS,
            brightening_factor: DEFAULT_BRIGHTENING_FACTOR,
            ffc_sigma: DEFAULT_FFC_SIGMA,
            threshold_mode: ThresholdMode::Otsu,
            adaptive_block_size: DEFAULT_ADAPTIVE_BLOCK_SIZE,
            multi_channel: true,
            inpaint_mode: InpaintMode::Careful,
            inpainting_radius: DEFAULT_INPAINTING_RADIUS,
            preserve_details: true,
            min_component_area: DEFAULT_MIN_COMPONENT_AREA,
        }
    }
}

impl HairRemovalConfig {
    /// Create a builder
    pub fn builder() -> HairRemovalConfigBuilder {
        HairRemovalConfigBuilder::default()
    }

    /// Cheaper settings: single fast inpainting, no selective denoise
    pub fn fast() -> Self {
        Self {
            inpaint_mode: InpaintMode::Fast,
            preserve_details: false,
            ..Default::default()
        }
    }

    /// Legacy single-channel mode (red channel only)
    pub fn red_channel_only() -> Self {
        Self {
            multi_channel: false,
            ..Default::default()
        }
    }

    /// Check every option is inside its usable range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.working_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "working size must be non-zero, got {}x{}",
                width, height
            )));
        }
        let longest = width.max(height);
        if self.tophat_radius == 0 || self.tophat_radius > longest {
            return Err(ConfigError::Invalid(format!(
                "top-hat radius must be within [1, {}], got {}",
                longest, self.tophat_radius
            )));
        }
        if !(0.0..=1.0).contains(&self.brightening_factor) {
            return Err(ConfigError::Invalid(format!(
                "brightening factor must be within [0, 1], got {}",
                self.brightening_factor
            )));
        }
        if !within_working_size(self.ffc_sigma, longest) {
            return Err(ConfigError::Invalid(format!(
                "FFC sigma must be positive, finite and at most {}, got {}",
                longest, self.ffc_sigma
            )));
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "adaptive block size must be odd and >= 3, got {}",
                self.adaptive_block_size
            )));
        }
        if !within_working_size(self.inpainting_radius, longest) {
            return Err(ConfigError::Invalid(format!(
                "inpainting radius must be positive, finite and at most {}, got {}",
                longest, self.inpainting_radius
            )));
        }
        if self.min_component_area == 0 {
            return Err(ConfigError::Invalid(
                "minimum component area must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the user config file, or defaults when there is none
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/dehair/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Apply command-line overrides (CLI takes precedence)
    #[must_use]
    pub fn merge_with_cli(&self, overrides: &CliOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(size) = overrides.working_size {
            merged.working_size = (size, size);
        }
        if let Some(radius) = overrides.tophat_radius {
            merged.tophat_radius = radius;
        }
        if let Some(factor) = overrides.brightening_factor {
            merged.brightening_factor = factor;
        }
        if let Some(sigma) = overrides.ffc_sigma {
            merged.ffc_sigma = sigma;
        }
        if let Some(mode) = overrides.threshold_mode {
            merged.threshold_mode = mode;
        }
        if let Some(block) = overrides.adaptive_block_size {
            merged.adaptive_block_size = block;
        }
        if let Some(multi) = overrides.multi_channel {
            merged.multi_channel = multi;
        }
        if let Some(mode) = overrides.inpaint_mode {
            merged.inpaint_mode = mode;
        }
        if let Some(radius) = overrides.inpainting_radius {
            merged.inpainting_radius = radius;
        }
        if let Some(preserve) = overrides.preserve_details {
            merged.preserve_details = preserve;
        }
        merged
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Positive, finite and no larger than the longest working side
fn within_working_size(value: f32, longest: u32) -> bool {
    value.is_finite() && value > 0.0 && value <= longest as f32
}

/// Values explicitly set on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub working_size: Option<u32>,
    pub tophat_radius: Option<u32>,
    pub brightening_factor: Option<f32>,
    pub ffc_sigma: Option<f32>,
    pub threshold_mode: Option<ThresholdMode>,
    pub adaptive_block_size: Option<u32>,
    pub multi_channel: Option<bool>,
    pub inpaint_mode: Option<InpaintMode>,
    pub inpainting_radius: Option<f32>,
    pub preserve_details: Option<bool>,
}

impl CliOverrides {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================
// Builder
// ============================================================

/// Builder for HairRemovalConfig
#[derive(Debug, Default)]
pub struct HairRemovalConfigBuilder {
    config: HairRemovalConfig,
}

impl HairRemovalConfigBuilder {
    /// Set working resolution
    #[must_use]
    pub fn working_size(mut self, width: u32, height: u32) -> Self {
        self.config.working_size = (width.max(1), height.max(1));
        self
    }

    /// Set top-hat radius
    #[must_use]
    pub fn tophat_radius(mut self, radius: u32) -> Self {
        self.config.tophat_radius = radius.max(1);
        self
    }

    /// Set brightening factor
    #[must_use]
    pub fn brightening_factor(mut self, factor: f32) -> Self {
        self.config.brightening_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Set flat-field sigma
    #[must_use]
    pub fn ffc_sigma(mut self, sigma: f32) -> Self {
        self.config.ffc_sigma = if sigma.is_finite() {
            sigma.max(0.1)
        } else {
            DEFAULT_FFC_SIGMA
        };
        self
    }

    /// Set thresholding mode
    #[must_use]
    pub fn threshold_mode(mut self, mode: ThresholdMode) -> Self {
        self.config.threshold_mode = mode;
        self
    }

    /// Set adaptive block size, rounded up to the next odd value >= 3
    #[must_use]
    pub fn adaptive_block_size(mut self, block_size: u32) -> Self {
        self.config.adaptive_block_size = block_size.max(3) | 1;
        self
    }

    /// Enable or disable three-channel fusion
    #[must_use]
    pub fn multi_channel(mut self, multi: bool) -> Self {
        self.config.multi_channel = multi;
        self
    }

    /// Set inpainting mode
    #[must_use]
    pub fn inpaint_mode(mut self, mode: InpaintMode) -> Self {
        self.config.inpaint_mode = mode;
        self
    }

    /// Set fast-mode inpainting radius
    #[must_use]
    pub fn inpainting_radius(mut self, radius: f32) -> Self {
        self.config.inpainting_radius = if radius.is_finite() {
            radius.max(1.0)
        } else {
            DEFAULT_INPAINTING_RADIUS
        };
        self
    }

    /// Enable or disable selective denoising
    #[must_use]
    pub fn preserve_details(mut self, preserve: bool) -> Self {
        self.config.preserve_details = preserve;
        self
    }

    /// Set minimum component area
    #[must_use]
    pub fn min_component_area(mut self, area: u32) -> Self {
        self.config.min_component_area = area.max(1);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> HairRemovalConfig {
        self.config
    }
}
