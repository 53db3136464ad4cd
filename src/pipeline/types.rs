//! Pipeline output types

use image::{GrayImage, RgbImage};
use std::path::Path;

use crate::metrics::PipelineStats;
use crate::types::Result;

/// Result of one hair removal run, all rasters at working resolution
#[derive(Debug, Clone)]
pub struct HairRemovalOutput {
    /// Reconstructed RGB image
    pub image: RgbImage,

    /// Final binary hair mask (0 or 255)
    pub mask: GrayImage,

    /// Coverage and fidelity statistics
    pub stats: PipelineStats,
}

impl HairRemovalOutput {
    /// Working resolution of the outputs
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Encode the reconstructed image; the format follows the extension
    pub fn save_image(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    /// Encode the mask; the format follows the extension
    pub fn save_mask(&self, path: &Path) -> Result<()> {
        self.mask.save(path)?;
        Ok(())
    }

    /// Write the statistics as pretty-printed JSON
    pub fn save_stats(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.stats)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
