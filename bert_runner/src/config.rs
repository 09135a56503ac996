use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LoadError;

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const VOCAB_FILE: &str = "vocab.txt";
pub const SAFETENSORS_FILE: &str = "model.safetensors";
pub const PYTORCH_FILE: &str = "pytorch_model.bin";

pub const DEFAULT_MAX_LENGTH: usize = 512;
/// `[CLS]`, `[SEP]` and at least one sentence token.
pub const MIN_MAX_LENGTH: usize = 3;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub model_dir: PathBuf,
    /// Class names in logit order.
    pub labels: Vec<String>,
    pub max_length: usize,
    /// Only applies when the tokenizer is built from `vocab.txt`.
    pub lowercase: bool,
}

impl RunnerConfig {
    pub fn new(model_dir: impl Into<PathBuf>, labels: Vec<String>) -> Self {
        Self {
            model_dir: model_dir.into(),
            labels,
            max_length: DEFAULT_MAX_LENGTH,
            lowercase: false,
        }
    }
}

/// The parts of `config.json` the classification head needs beyond the encoder config.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadConfig {
    pub hidden_size: usize,
    #[serde(default)]
    pub pad_token_id: u32,
    #[serde(default = "default_max_positions")]
    pub max_position_embeddings: usize,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

fn default_max_positions() -> usize {
    DEFAULT_MAX_LENGTH
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenizerSource {
    Json(PathBuf),
    Vocab(PathBuf),
}

impl TokenizerSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Json(p) | Self::Vocab(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeightsSource {
    SafeTensors(PathBuf),
    Pytorch(PathBuf),
}

impl WeightsSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::SafeTensors(p) | Self::Pytorch(p) => p,
        }
    }
}

/// Resolved file locations inside a model directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: TokenizerSource,
    pub weights: WeightsSource,
}

impl ModelFiles {
    pub fn locate(dir: &Path) -> Result<Self, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError::MissingDirectory(dir.to_path_buf()));
        }

        let config = dir.join(CONFIG_FILE);
        if !config.is_file() {
            return Err(LoadError::MissingFile {
                dir: dir.to_path_buf(),
                what: "model config",
                candidates: CONFIG_FILE.to_string(),
            });
        }

        let tokenizer = if dir.join(TOKENIZER_FILE).is_file() {
            TokenizerSource::Json(dir.join(TOKENIZER_FILE))
        } else if dir.join(VOCAB_FILE).is_file() {
            TokenizerSource::Vocab(dir.join(VOCAB_FILE))
        } else {
            return Err(LoadError::MissingFile {
                dir: dir.to_path_buf(),
                what: "tokenizer",
                candidates: format!("{TOKENIZER_FILE}, {VOCAB_FILE}"),
            });
        };

        let weights = if dir.join(SAFETENSORS_FILE).is_file() {
            WeightsSource::SafeTensors(dir.join(SAFETENSORS_FILE))
        } else if dir.join(PYTORCH_FILE).is_file() {
            WeightsSource::Pytorch(dir.join(PYTORCH_FILE))
        } else {
            return Err(LoadError::MissingFile {
                dir: dir.to_path_buf(),
                what: "model weights",
                candidates: format!("{SAFETENSORS_FILE}, {PYTORCH_FILE}"),
            });
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}
