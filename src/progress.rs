//! Progress notification for the hair removal pipeline.
//!
//! The pipeline reports a fixed sequence of [`Checkpoint`]s to an optional
//! [`ProgressCallback`]. Callbacks are invoked synchronously; a callback that
//! panics is logged and otherwise ignored.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Named pipeline checkpoints, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// Channel enhancement and fusion finished
    EnhancementDone,
    /// Candidate mask produced
    ThresholdingDone,
    /// Final mask produced
    CleaningDone,
    /// About to inpaint
    Inpainting,
    /// Inpainting finished
    InpaintingDone,
    /// Denoise, contrast and sharpening finished
    SelectiveEnhancementDone,
    /// Statistics computed, outputs ready
    Complete,
}

impl Checkpoint {
    /// All checkpoints in the order the pipeline emits them
    pub const ALL: [Checkpoint; 7] = [
        Checkpoint::EnhancementDone,
        Checkpoint::ThresholdingDone,
        Checkpoint::CleaningDone,
        Checkpoint::Inpainting,
        Checkpoint::InpaintingDone,
        Checkpoint::SelectiveEnhancementDone,
        Checkpoint::Complete,
    ];

    /// Stable machine-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Checkpoint::EnhancementDone => "enhancement_done",
            Checkpoint::ThresholdingDone => "thresholding_done",
            Checkpoint::CleaningDone => "cleaning_done",
            Checkpoint::Inpainting => "inpainting",
            Checkpoint::InpaintingDone => "inpainting_done",
            Checkpoint::SelectiveEnhancementDone => "selective_enhancement",
            Checkpoint::Complete => "complete",
        }
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            Checkpoint::EnhancementDone => "Enhancement done",
            Checkpoint::ThresholdingDone => "Thresholding done",
            Checkpoint::CleaningDone => "Cleaning done",
            Checkpoint::Inpainting => "Inpainting...",
            Checkpoint::InpaintingDone => "Inpainting done",
            Checkpoint::SelectiveEnhancementDone => "Final enhancement done",
            Checkpoint::Complete => "Complete",
        }
    }

    /// Approximate overall progress when this checkpoint is reached
    pub fn percent(&self) -> u8 {
        match self {
            Checkpoint::EnhancementDone => 10,
            Checkpoint::ThresholdingDone => 30,
            Checkpoint::CleaningDone => 50,
            Checkpoint::Inpainting => 60,
            Checkpoint::InpaintingDone => 75,
            Checkpoint::SelectiveEnhancementDone => 90,
            Checkpoint::Complete => 100,
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%)", self.description(), self.percent())
    }
}

/// Receiver of pipeline checkpoints
pub trait ProgressCallback: Sync {
    /// Called once per checkpoint, on the pipeline's thread
    fn on_checkpoint(&self, checkpoint: Checkpoint);
}

impl<F> ProgressCallback for F
where
    F: Fn(Checkpoint) + Sync,
{
    fn on_checkpoint(&self, checkpoint: Checkpoint) {
        self(checkpoint)
    }
}

/// Callback that ignores every checkpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_checkpoint(&self, _checkpoint: Checkpoint) {}
}

/// Deliver `checkpoint` to the sink, if any, isolating the pipeline from panics
pub(crate) fn notify(sink: Option<&dyn ProgressCallback>, checkpoint: Checkpoint) {
    let Some(sink) = sink else {
        return;
    };

    let delivered = panic::catch_unwind(AssertUnwindSafe(|| sink.on_checkpoint(checkpoint)));
    if delivered.is_err() {
        tracing::warn!(checkpoint = checkpoint.name(), "progress callback panicked");
    }
}
