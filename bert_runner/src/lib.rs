pub mod config;
pub mod error;
pub mod runner;
pub mod score;
mod tokenizer;

pub mod label {
    /// Scores for one sentence, aligned with the label set of the runner that produced it.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Prediction {
        pub sentence: String,
        pub label: String,
        pub index: usize,
        pub probabilities: Vec<f32>,
    }

    impl Prediction {
        pub fn probability_of(&self, labels: &[String], label: &str) -> Option<f32> {
            labels
                .iter()
                .position(|l| l == label)
                .and_then(|i| self.probabilities.get(i).copied())
        }
    }
}

/// Anything that turns a sentence into one logit per class label.
pub trait SequenceClassifier {
    fn labels(&self) -> &[String];

    fn logits(&self, sentence: &str) -> anyhow::Result<Vec<f32>>;

    fn predict(&self, sentence: &str) -> anyhow::Result<label::Prediction> {
        let logits = self.logits(sentence)?;
        score::prediction_from_logits(sentence, self.labels(), &logits)
    }
}

pub use candle_core::Device;
pub use config::RunnerConfig;
pub use error::LoadError;
pub use runner::BertRunner;
