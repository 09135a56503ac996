use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bert_runner::label::Prediction;
use bert_runner::{BertRunner, Device, LoadError, SequenceClassifier};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ClassificationConfig;
use crate::dataset::{self, SentenceEntry};
use crate::progress::ProgressTracker;
use crate::writer::write_classification_csv;

#[derive(Debug)]
pub enum ClassificationOutcome {
    Written(ClassificationReport),
    /// The model could not be loaded; nothing was written.
    Skipped(LoadError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub path: PathBuf,
    pub rows: usize,
    pub agreement: Option<Agreement>,
}

/// How many predictions matched the hand-assigned labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Agreement {
    pub matched: usize,
    pub total: usize,
}

impl Agreement {
    pub fn measure(entries: &[SentenceEntry], predictions: &[Prediction]) -> Option<Self> {
        let mut matched = 0;
        let mut total = 0;
        for (entry, prediction) in entries.iter().zip(predictions) {
            if let Some(expected) = &entry.expected {
                total += 1;
                if *expected == prediction.label {
                    matched += 1;
                } else {
                    warn!(
                        "Expected {} but predicted {} for: {}",
                        expected, prediction.label, entry.sentence
                    );
                }
            }
        }
        (total > 0).then_some(Self { matched, total })
    }

    pub fn percent(&self) -> f64 {
        100.0 * self.matched as f64 / self.total as f64
    }
}

#[instrument(skip_all, fields(model_dir = %config.model_dir.display()))]
pub fn run_classification(config: &ClassificationConfig) -> Result<ClassificationOutcome> {
    debug!("Loading classification sentences...");
    let entries = dataset::classification_entries(config.sentences.as_deref())?;

    let runner = match BertRunner::load(&config.to_runner_config(), Device::Cpu) {
        Ok(runner) => runner,
        Err(err) => {
            error!("Failed to load model or tokenizer: {}", err);
            return Ok(ClassificationOutcome::Skipped(err));
        }
    };
    debug!("Running on {:?}", runner.device());

    let report = classify_to_csv(&runner, &entries, &config.output)?;
    Ok(ClassificationOutcome::Written(report))
}

/// Classifies every entry in order, then writes the whole result set at once.
pub fn classify_to_csv<C: SequenceClassifier>(
    classifier: &C,
    entries: &[SentenceEntry],
    output: &Path,
) -> Result<ClassificationReport> {
    let predictions = classify_entries(classifier, entries)?;

    let path = write_classification_csv(output, classifier.labels(), &predictions)?;
    info!("Results exported to {}", path.display());

    let agreement = Agreement::measure(entries, &predictions);
    if let Some(agreement) = &agreement {
        info!(
            "Agreement with expected labels: {}/{} ({:.2}%)",
            agreement.matched,
            agreement.total,
            agreement.percent()
        );
    }

    Ok(ClassificationReport {
        path,
        rows: predictions.len(),
        agreement,
    })
}

pub fn classify_entries<C: SequenceClassifier>(
    classifier: &C,
    entries: &[SentenceEntry],
) -> Result<Vec<Prediction>> {
    let mut progress = ProgressTracker::new(entries.len());
    let mut predictions = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        let prediction = classifier
            .predict(&entry.sentence)
            .with_context(|| format!("Failed to classify sentence {}: {}", idx, entry.sentence))?;
        debug!("{} -> {}", entry.sentence, prediction.label);

        progress.update(format!("Classified sentence {}", idx + 1));
        predictions.push(prediction);
    }

    progress.finish("Classification complete");
    Ok(predictions)
}
