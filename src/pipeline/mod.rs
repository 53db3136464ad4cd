//! Hair removal pipeline
//!
//! Chains the stages at the working resolution:
//!
//! ```text
//! resize -> enhance -> threshold -> clean -> inpaint -> restore -> stats
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dehair::{HairRemovalConfig, HairRemover};
//! use std::path::Path;
//!
//! let remover = HairRemover::new(HairRemovalConfig::default());
//! let output = remover.process_file(Path::new("lesion.jpg"), None).unwrap();
//! output.save_image(Path::new("lesion_clean.png")).unwrap();
//! println!("hair coverage: {:.2}%", output.stats.final_hair_coverage);
//! ```

mod remover;
mod types;

pub use remover::{remove_hairs, HairRemover};
pub use types::HairRemovalOutput;
