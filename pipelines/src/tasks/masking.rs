use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use tracing::{debug, info, instrument, warn};
use unmask_client::{GradioClient, MaskPrediction, MaskPredictor};

use crate::config::MaskingConfig;
use crate::dataset;
use crate::progress::ProgressTracker;
use crate::writer::write_json;

const MASK_TOKEN: &str = "[MASK]";

/// Predictions keyed by sentence, in the order the sentences were submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskingReport {
    entries: Vec<(String, MaskPrediction)>,
}

impl MaskingReport {
    pub fn get(&self, sentence: &str) -> Option<&MaskPrediction> {
        self.entries
            .iter()
            .find(|(s, _)| s == sentence)
            .map(|(_, p)| p)
    }

    pub fn sentences(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MaskingReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(s, p)| (s, p)))
    }
}

#[instrument(skip_all, fields(space = %config.space))]
pub fn run_masking(config: &MaskingConfig) -> Result<PathBuf> {
    let sentences = dataset::masked_sentences(config.sentences.as_deref())?;

    if config.token.is_none() {
        warn!("No Hugging Face token set (HF_TOKEN); private Spaces will reject requests");
    }

    let client = GradioClient::connect(config.to_client_config()?)
        .with_context(|| format!("Failed to connect to {}", config.space))?;

    predict_to_json(&client, &sentences, &config.output)
}

/// Collects every prediction first; the file is only written if all of them succeed.
pub fn predict_to_json<P: MaskPredictor>(
    predictor: &P,
    sentences: &[String],
    output: &Path,
) -> Result<PathBuf> {
    let report = collect_predictions(predictor, sentences)?;

    let path = write_json(output, &report)?;
    info!("Processed results saved to {}", path.display());
    Ok(path)
}

/// Sends each distinct sentence once, in order. Any failure aborts the whole run.
pub fn collect_predictions<P: MaskPredictor>(predictor: &P, sentences: &[String]) -> Result<MaskingReport> {
    let distinct = distinct_sentences(sentences);
    let mut progress = ProgressTracker::new(distinct.len());
    let mut report = MaskingReport::default();

    for sentence in distinct {
        if !sentence.contains(MASK_TOKEN) {
            warn!("Sentence has no {} token: {}", MASK_TOKEN, sentence);
        }

        let prediction = predictor
            .predict(sentence)
            .with_context(|| format!("Prediction failed for: {sentence}"))?;
        debug!("{} -> {}", sentence, prediction.label);

        progress.update(format!("Unmasked {}", prediction.label));
        report.entries.push((sentence.to_string(), prediction));
    }

    progress.finish("Unmasking complete");
    Ok(report)
}

/// First occurrence of each sentence, in input order.
fn distinct_sentences(sentences: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    sentences
        .iter()
        .map(String::as_str)
        .filter(|sentence| {
            let first = seen.insert(*sentence);
            if !first {
                warn!("Skipping duplicate sentence: {}", sentence);
            }
            first
        })
        .collect()
}
