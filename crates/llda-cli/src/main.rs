//! Labeled LDA command-line tool
//!
//! # Usage
//!
//! ```bash
//! llda fit --corpus train_x.svmlight --labels train_y.low [--max-iter N] [--alpha A] [--beta B]
//! llda predict-proba --corpus test_x.svmlight [--output probs.txt] [--particles N]
//! llda predict --corpus test_x.svmlight [--output labels.txt] [--lambda L] [--format ids]
//! llda inspect
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/labeled-lda/config.toml)
//! 3. Environment variables (LLDA_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use llda_cli::{
    init_logging, load_settings, run_fit, run_predict, run_predict_proba, show_model, Cli,
    Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.model_dir.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Fit(args) => {
            run_fit(settings, args).await?;
        }
        Commands::PredictProba(args) => {
            run_predict_proba(settings, args).await?;
        }
        Commands::Predict(args) => {
            run_predict(settings, args).await?;
        }
        Commands::Inspect => {
            show_model(&settings)?;
        }
    }

    Ok(())
}
