use std::path::PathBuf;

use thiserror::Error;

/// Why a model directory could not be turned into a runnable classifier.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("no {what} in {dir} (looked for {candidates})")]
    MissingFile {
        dir: PathBuf,
        what: &'static str,
        candidates: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build tokenizer from {path}: {reason}")]
    Tokenizer { path: PathBuf, reason: String },

    #[error("special token {token} missing from vocabulary {path}")]
    MissingSpecialToken { token: &'static str, path: PathBuf },

    #[error("failed to load weights from {path}: {source}")]
    Weights {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    #[error("{expected} class labels configured but the model was trained with {found}")]
    LabelMismatch { expected: usize, found: usize },

    #[error("max length {max_length} outside {min}..={max} for this model")]
    InvalidMaxLength {
        max_length: usize,
        min: usize,
        max: usize,
    },

    #[error("no class labels configured")]
    NoLabels,
}
