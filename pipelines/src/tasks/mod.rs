pub mod classification;
pub mod masking;

pub use classification::{run_classification, ClassificationOutcome, ClassificationReport};
pub use masking::{run_masking, MaskingReport};
