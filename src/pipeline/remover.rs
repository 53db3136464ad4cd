//! Hair removal entry point

use image::{GrayImage, RgbImage};
use std::path::Path;
use tracing::{info, info_span};

use super::types::HairRemovalOutput;
use crate::config::HairRemovalConfig;
use crate::enhance::{enhance_image, ChannelParams};
use crate::inpaint::Inpainter;
use crate::mask::{apply_threshold, MaskCleaner};
use crate::metrics::PipelineStats;
use crate::progress::{notify, Checkpoint, ProgressCallback};
use crate::resize::resize_to_working;
use crate::restore::{restore_details, RestoreOptions};
use crate::types::{HairRemovalError, Result};

/// Removes hair artifacts from dermoscopic images
///
/// Holds an immutable configuration; a single remover can serve any number
/// of independent (and concurrent) invocations.
#[derive(Debug, Clone, Default)]
pub struct HairRemover {
    config: HairRemovalConfig,
}

impl HairRemover {
    /// Create a remover with the given configuration
    pub fn new(config: HairRemovalConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &HairRemovalConfig {
        &self.config
    }

    /// Run the whole pipeline on an RGB image of any size
    ///
    /// The image is resized to the working resolution first; every output is
    /// at that resolution. `progress`, when given, receives each
    /// [`Checkpoint`] in order.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` when the configuration fails validation
    /// - `InvalidImage` when the image has no pixels
    /// - `DimensionMismatch` if stages disagree on raster size
    pub fn remove_hairs(
        &self,
        image: &RgbImage,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<HairRemovalOutput> {
        self.config.validate()?;
        let (width, height) = self.config.working_size;
        let _span = info_span!("remove_hairs", width, height).entered();

        let resized = resize_to_working(image, width, height)?;

        // Step 1: enhancement
        let params = ChannelParams::from(&self.config);
        let hairness = enhance_image(&resized, &params, self.config.multi_channel);
        notify(progress, Checkpoint::EnhancementDone);

        // Step 2: thresholding
        let candidate = apply_threshold(
            &hairness,
            self.config.threshold_mode,
            self.config.adaptive_block_size,
        );
        notify(progress, Checkpoint::ThresholdingDone);

        // Step 3: cleaning
        let final_mask = MaskCleaner::from_config(&self.config).clean(&candidate);
        notify(progress, Checkpoint::CleaningDone);

        // Step 4: inpainting
        notify(progress, Checkpoint::Inpainting);
        let inpainted = Inpainter::from_config(&self.config).inpaint(&resized, &final_mask)?;
        notify(progress, Checkpoint::InpaintingDone);

        // Step 5: detail restoration
        let options = RestoreOptions::with_details(self.config.preserve_details);
        let reconstructed = restore_details(&inpainted, &final_mask, &options)?;
        notify(progress, Checkpoint::SelectiveEnhancementDone);

        let stats = PipelineStats::compute(&candidate, &final_mask, &resized, &reconstructed)?;
        info!(
            initial_coverage = stats.initial_hair_coverage,
            final_coverage = stats.final_hair_coverage,
            hair_pixels = stats.final_hair_pixels,
            psnr = stats.psnr,
            "hair removal finished"
        );
        notify(progress, Checkpoint::Complete);

        Ok(HairRemovalOutput {
            image: reconstructed,
            mask: final_mask,
            stats,
        })
    }

    /// Run the pipeline on an interleaved RGB8 buffer
    ///
    /// # Errors
    ///
    /// `InvalidImage` when `data` is not exactly `width * height * 3` bytes,
    /// plus everything [`HairRemover::remove_hairs`] can return.
    pub fn remove_hairs_from_raw(
        &self,
        width: u32,
        height: u32,
        data: &[u8],
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<HairRemovalOutput> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(HairRemovalError::InvalidImage(format!(
                "buffer holds {} bytes, {}x{} RGB needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        let image = RgbImage::from_raw(width, height, data.to_vec()).ok_or_else(|| {
            HairRemovalError::InvalidImage(format!("cannot build {}x{} raster", width, height))
        })?;
        self.remove_hairs(&image, progress)
    }

    /// Decode an image file and run the pipeline on it
    pub fn process_file(
        &self,
        input: &Path,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<HairRemovalOutput> {
        let image = image::open(input)?.to_rgb8();
        info!(path = %input.display(), width = image.width(), height = image.height(), "decoded input");
        self.remove_hairs(&image, progress)
    }

    /// Candidate and final masks only, without inpainting
    ///
    /// Useful for inspecting detection settings.
    pub fn detect_mask(&self, image: &RgbImage) -> Result<(GrayImage, GrayImage)> {
        self.config.validate()?;
        let (width, height) = self.config.working_size;
        let resized = resize_to_working(image, width, height)?;
        let params = ChannelParams::from(&self.config);
        let hairness = enhance_image(&resized, &params, self.config.multi_channel);
        let candidate = apply_threshold(
            &hairness,
            self.config.threshold_mode,
            self.config.adaptive_block_size,
        );
        let final_mask = MaskCleaner::from_config(&self.config).clean(&candidate);
        Ok((candidate, final_mask))
    }
}

/// Run the pipeline with `config` on `image`
pub fn remove_hairs(
    image: &RgbImage,
    config: &HairRemovalConfig,
    progress: Option<&dyn ProgressCallback>,
) -> Result<HairRemovalOutput> {
    HairRemover::new(config.clone()).remove_hairs(image, progress)
}
