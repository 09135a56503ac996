use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use conflibert::config::{ClassificationConfig, MaskingConfig};
use conflibert::tasks::{run_classification, run_masking, ClassificationOutcome};

#[derive(Debug, Parser)]
#[command(name = "conflibert", about = "ConfliBERT classification and masked-token pipelines")]
struct Opt {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify police event sentences with a local model and write a CSV
    Classify(ClassifyArgs),
    /// Fill [MASK] tokens through a hosted Gradio app and write JSON
    Unmask(UnmaskArgs),
    /// Run both pipelines; a skipped classification does not stop unmasking
    All {
        #[command(flatten)]
        classify: ClassifyArgs,
        #[command(flatten)]
        unmask: UnmaskArgs,
    },
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// Pretrained model directory (config.json, tokenizer, weights)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Class labels in logit order
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    #[arg(long)]
    max_length: Option<usize>,

    /// Lowercase input when building the tokenizer from vocab.txt
    #[arg(long)]
    lowercase: bool,

    /// Output CSV path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Sentence file (.csv with a `sentence` column, or one per line)
    #[arg(long)]
    sentences: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct UnmaskArgs {
    /// Space id (owner/name) or base URL of a Gradio app
    #[arg(long)]
    space: Option<String>,

    #[arg(long)]
    api_name: Option<String>,

    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output JSON path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Masked sentence file (.csv with a `sentence` column, or one per line)
    #[arg(long)]
    masked_sentences: Option<PathBuf>,
}

impl ClassifyArgs {
    fn into_config(self) -> ClassificationConfig {
        let mut config = ClassificationConfig::police_events();
        if let Some(dir) = self.model_dir {
            config.model_dir = dir;
        }
        if let Some(labels) = self.labels {
            config.labels = labels.into_iter().map(|l| l.trim().to_string()).collect();
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        config.lowercase = self.lowercase;
        if let Some(csv) = self.csv {
            config.output = csv;
        }
        config.sentences = self.sentences;
        config
    }
}

impl UnmaskArgs {
    fn into_config(self) -> MaskingConfig {
        let mut config = MaskingConfig::conflibert_unmask();
        if let Some(space) = self.space {
            config.space = space;
        }
        if let Some(api_name) = self.api_name {
            config.api_name = api_name;
        }
        config.token = self.hf_token.filter(|t| !t.is_empty());
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(json) = self.json {
            config.output = json;
        }
        config.sentences = self.masked_sentences;
        config
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let level = if opt.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match opt.command {
        Command::Classify(args) => classify(args.into_config()),
        Command::Unmask(args) => unmask(args.into_config()),
        Command::All { classify: c, unmask: u } => {
            classify(c.into_config())?;
            unmask(u.into_config())
        }
    }
}

fn classify(config: ClassificationConfig) -> Result<()> {
    info!("Starting classification with model {}", config.model_dir.display());
    match run_classification(&config)? {
        ClassificationOutcome::Written(report) => {
            info!("Wrote {} rows to {}", report.rows, report.path.display());
        }
        ClassificationOutcome::Skipped(reason) => {
            warn!("Classification skipped: {}", reason);
        }
    }
    Ok(())
}

fn unmask(config: MaskingConfig) -> Result<()> {
    info!("Starting masked-token predictions via {}", config.space);
    let path = run_masking(&config)?;
    info!("Wrote predictions to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Opt::command().debug_assert();
    }

    #[test]
    fn classify_overrides_preset() {
        let opt = Opt::try_parse_from([
            "conflibert",
            "classify",
            "--model-dir",
            "/models/police",
            "--labels",
            "A, B",
            "--csv",
            "out/results.csv",
        ])
        .unwrap();

        let Command::Classify(args) = opt.command else {
            panic!("expected classify");
        };
        let config = args.into_config();
        assert_eq!(config.model_dir, PathBuf::from("/models/police"));
        assert_eq!(config.labels, ["A", "B"]);
        assert_eq!(config.output, PathBuf::from("out/results.csv"));
        assert_eq!(config.max_length, 512);
    }

    #[test]
    fn all_accepts_both_option_sets() {
        let opt = Opt::try_parse_from([
            "conflibert",
            "--verbose",
            "all",
            "--sentences",
            "police.txt",
            "--masked-sentences",
            "masked.txt",
            "--hf-token",
            "hf_test",
            "--timeout-secs",
            "5",
        ])
        .unwrap();
        assert!(opt.verbose);

        let Command::All { classify, unmask } = opt.command else {
            panic!("expected all");
        };
        assert_eq!(classify.into_config().sentences, Some(PathBuf::from("police.txt")));

        let masking = unmask.into_config();
        assert_eq!(masking.sentences, Some(PathBuf::from("masked.txt")));
        assert_eq!(masking.token.as_deref(), Some("hf_test"));
        assert_eq!(masking.timeout, Duration::from_secs(5));
        assert_eq!(masking.space, "shreyasmeher/ConfliBERT_Unmask");
    }
}
