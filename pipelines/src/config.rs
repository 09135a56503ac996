use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bert_runner::config::DEFAULT_MAX_LENGTH;
use bert_runner::RunnerConfig;
use unmask_client::client::{DEFAULT_API_NAME, DEFAULT_TIMEOUT, HUB_SPACES_API};
use unmask_client::{ClientConfig, SpaceRef};

/// Classes of the IndiaPoliceEvents sentence model, in logit order.
pub const POLICE_EVENT_LABELS: [&str; 5] = ["KILL", "ARREST", "FAIL", "FORCE", "ANY_ACTION"];

const POLICE_EVENTS_MODEL_DIR: &str = "model/best_model";
const CLASSIFICATION_OUTPUT: &str = "classification_results.csv";

const UNMASK_SPACE: &str = "shreyasmeher/ConfliBERT_Unmask";
const MASKING_OUTPUT: &str = "processed_results.json";

#[derive(Clone, Debug)]
pub struct ClassificationConfig {
    pub model_dir: PathBuf,
    pub labels: Vec<String>,
    pub max_length: usize,
    pub lowercase: bool,
    pub output: PathBuf,
    /// Replaces the built-in sentence list when set.
    pub sentences: Option<PathBuf>,
}

impl ClassificationConfig {
    pub fn police_events() -> Self {
        Self {
            model_dir: PathBuf::from(POLICE_EVENTS_MODEL_DIR),
            labels: POLICE_EVENT_LABELS.iter().map(|l| l.to_string()).collect(),
            max_length: DEFAULT_MAX_LENGTH,
            lowercase: false,
            output: PathBuf::from(CLASSIFICATION_OUTPUT),
            sentences: None,
        }
    }

    pub fn to_runner_config(&self) -> RunnerConfig {
        let mut runner = RunnerConfig::new(&self.model_dir, self.labels.clone());
        runner.max_length = self.max_length;
        runner.lowercase = self.lowercase;
        runner
    }
}

/// Not `Debug`: holds the access token.
#[derive(Clone)]
pub struct MaskingConfig {
    pub space: String,
    pub api_name: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub hub_api: String,
    pub output: PathBuf,
    pub sentences: Option<PathBuf>,
}

impl MaskingConfig {
    pub fn conflibert_unmask() -> Self {
        Self {
            space: UNMASK_SPACE.to_string(),
            api_name: DEFAULT_API_NAME.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            hub_api: HUB_SPACES_API.to_string(),
            output: PathBuf::from(MASKING_OUTPUT),
            sentences: None,
        }
    }

    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let space: SpaceRef = self
            .space
            .parse()
            .with_context(|| format!("Invalid --space value: {}", self.space))?;

        let mut client = ClientConfig::new(space, self.token.clone());
        client.api_name = self.api_name.clone();
        client.timeout = self.timeout;
        client.hub_api = self.hub_api.clone();
        Ok(client)
    }
}
