pub mod client;
pub mod error;
pub mod prediction;
pub mod sse;

pub use client::{ClientConfig, GradioClient, SpaceRef};
pub use error::UnmaskError;
pub use prediction::{Confidence, Confidences, MaskPrediction};

/// Fills the `[MASK]` slot of one sentence.
pub trait MaskPredictor {
    fn predict(&self, sentence: &str) -> Result<MaskPrediction, UnmaskError>;
}
