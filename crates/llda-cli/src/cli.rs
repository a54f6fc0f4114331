//! CLI argument parsing for `llda`.
//!
//! CLI flags override every other config source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Labeled LDA
///
/// Train a Labeled LDA model from `term:count` documents and 1-indexed label
/// files, then infer topic probabilities and labels for new documents.
#[derive(Parser, Debug)]
#[command(name = "llda")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/labeled-lda/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the model artifact directory
    #[arg(long, global = true)]
    pub model_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model and write its artifacts to the model directory
    Fit(FitArgs),

    /// Write per-document topic probabilities
    PredictProba(PredictProbaArgs),

    /// Write thresholded labels per document
    Predict(PredictArgs),

    /// Show the stored model and the effective configuration
    Inspect,
}

/// Arguments for `fit`
#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    /// Training documents (`term:count` per line, 1-indexed terms)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Training labels (1-indexed label ids per line)
    #[arg(long)]
    pub labels: PathBuf,

    /// Label-space width (default: largest label id in the file)
    #[arg(long)]
    pub class_num: Option<usize>,

    /// Override Gibbs sweep count
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Override document-topic smoothing
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Override topic-term smoothing
    #[arg(long)]
    pub beta: Option<f64>,

    /// Override the training seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Particle filter overrides shared by the prediction commands
#[derive(Args, Debug, Clone, Default)]
pub struct InferenceArgs {
    /// Particles per document
    #[arg(long)]
    pub particles: Option<usize>,

    /// Resample when the effective sample size falls below this
    #[arg(long)]
    pub ess: Option<usize>,

    /// Rejuvenate every N tokens
    #[arg(long)]
    pub rejuvenation: Option<usize>,

    /// Override the inference seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Infer documents one at a time
    #[arg(long)]
    pub sequential: bool,
}

/// Arguments for `predict-proba`
#[derive(Args, Debug, Clone)]
pub struct PredictProbaArgs {
    /// Documents to infer (`term:count` per line)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub inference: InferenceArgs,
}

/// Label output layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LabelFormat {
    /// 0/1 indicator row per document
    #[default]
    Indicator,
    /// 1-indexed label ids per document, highest probability first
    Ids,
}

/// Arguments for `predict`
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Documents to label (`term:count` per line)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the Boltzmann shape parameter
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Output layout (default from config: indicator)
    #[arg(long, value_enum)]
    pub format: Option<LabelFormat>,

    #[command(flatten)]
    pub inference: InferenceArgs,
}
