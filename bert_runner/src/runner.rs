use std::fs;

use anyhow::{Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Encoding, Tokenizer};
use tracing::{info, instrument};

use crate::config::{HeadConfig, ModelFiles, RunnerConfig, WeightsSource, MIN_MAX_LENGTH};
use crate::error::LoadError;
use crate::tokenizer::load_tokenizer;
use crate::SequenceClassifier;

/// BERT encoder with the pooler and linear head of a `BertForSequenceClassification` checkpoint.
pub struct BertRunner {
    encoder: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
}

impl BertRunner {
    /// Reads the model directory. Nothing here touches the network.
    #[instrument(skip_all, fields(model_dir = %config.model_dir.display()))]
    pub fn load(config: &RunnerConfig, device: Device) -> Result<Self, LoadError> {
        if config.labels.is_empty() {
            return Err(LoadError::NoLabels);
        }

        let files = ModelFiles::locate(&config.model_dir)?;
        info!("Loading classifier from {}", config.model_dir.display());

        let raw = fs::read_to_string(&files.config).map_err(|source| LoadError::Io {
            path: files.config.clone(),
            source,
        })?;
        let config_err = |source| LoadError::Config {
            path: files.config.clone(),
            source,
        };
        let bert_config: BertConfig = serde_json::from_str(&raw).map_err(config_err)?;
        let head: HeadConfig = serde_json::from_str(&raw).map_err(config_err)?;

        if !head.id2label.is_empty() && head.id2label.len() != config.labels.len() {
            return Err(LoadError::LabelMismatch {
                expected: config.labels.len(),
                found: head.id2label.len(),
            });
        }

        if !(MIN_MAX_LENGTH..=head.max_position_embeddings).contains(&config.max_length) {
            return Err(LoadError::InvalidMaxLength {
                max_length: config.max_length,
                min: MIN_MAX_LENGTH,
                max: head.max_position_embeddings,
            });
        }

        let tokenizer = load_tokenizer(&files.tokenizer, config, head.pad_token_id)?;

        let weights_path = files.weights.path().to_path_buf();
        let weights_err = |source| LoadError::Weights {
            path: weights_path.clone(),
            source,
        };
        let vb = match &files.weights {
            // SAFETY: the file is mapped read-only and not modified while the runner lives.
            WeightsSource::SafeTensors(p) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[p], DType::F32, &device)
            },
            WeightsSource::Pytorch(p) => VarBuilder::from_pth(p, DType::F32, &device),
        }
        .map_err(weights_err)?;

        let (encoder, pooler, classifier) =
            build_layers(vb, &bert_config, head.hidden_size, config.labels.len())
                .map_err(weights_err)?;

        info!(
            "Classifier loaded: {} labels, hidden size {}",
            config.labels.len(),
            head.hidden_size
        );

        Ok(Self {
            encoder,
            pooler,
            classifier,
            tokenizer,
            labels: config.labels.clone(),
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    fn forward(&self, encoding: &Encoding) -> candle_core::Result<Tensor> {
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .encoder
            .forward(&input_ids, &type_ids, Some(&attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        self.classifier.forward(&pooled)?.squeeze(0)
    }
}

impl SequenceClassifier for BertRunner {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn logits(&self, sentence: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(sentence, true)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to tokenize: {sentence}"))?;

        let logits = self
            .forward(&encoding)
            .context("Forward pass failed")?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;
        Ok(logits)
    }
}

/// Tensor names follow the Hugging Face `BertForSequenceClassification` layout.
fn build_layers(
    vb: VarBuilder,
    config: &BertConfig,
    hidden_size: usize,
    num_labels: usize,
) -> candle_core::Result<(BertModel, Linear, Linear)> {
    let encoder = BertModel::load(vb.pp("bert"), config)?;
    let pooler = linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense"))?;
    let classifier = linear(hidden_size, num_labels, vb.pp("classifier"))?;
    Ok((encoder, pooler, classifier))
}
