//! Common types shared by every pipeline stage

use thiserror::Error;

use crate::config::ConfigError;

/// Hair removal error types
#[derive(Debug, Error)]
pub enum HairRemovalError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Dimension mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image codec error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, HairRemovalError>;

/// Fail with `DimensionMismatch` unless both sizes agree
pub(crate) fn ensure_same_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected != actual {
        return Err(HairRemovalError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
