//! Command implementations for `llda`.
//!
//! Handles:
//! - fit: read training files, train, persist artifacts
//! - predict-proba: load artifacts, run the particle filter, write the matrix
//! - predict: as predict-proba, then apply the label decision
//! - inspect: summarise the stored model and effective configuration

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use llda_engine::{LabeledLda, LldaParams, ModelStore, Prediction};
use llda_types::{format, Corpus, Settings};

use crate::cli::{FitArgs, InferenceArgs, LabelFormat, PredictArgs, PredictProbaArgs};

/// Load configuration and apply the global CLI overrides.
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    model_dir_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(model_dir) = model_dir_override {
        settings.model_dir = model_dir.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn model_store(settings: &Settings) -> ModelStore {
    ModelStore::new(settings.expanded_model_dir(), settings.artifact_prefix.clone())
}

fn read_corpus(path: &Path) -> Result<Corpus> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    format::read_corpus(BufReader::new(file)).with_context(|| format!("Failed to parse {:?}", path))
}

/// Open `path` for writing, or stdout when no path is given.
fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
            let file =
                File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn apply_inference_overrides(settings: &mut Settings, args: &InferenceArgs) {
    let inference = &mut settings.inference;
    if let Some(particles) = args.particles {
        inference.n_particles = particles;
    }
    if let Some(ess) = args.ess {
        inference.ess_threshold = ess;
    }
    if let Some(rejuvenation) = args.rejuvenation {
        inference.rejuvenation_period = rejuvenation;
    }
    if let Some(seed) = args.seed {
        inference.seed = seed;
    }
    if args.sequential {
        inference.parallel = false;
    }
}

/// Train from files and persist the model.
///
/// Training runs on the blocking pool; Ctrl+C cancels it at the next sweep
/// and no artifacts are written.
pub async fn run_fit(mut settings: Settings, args: FitArgs) -> Result<()> {
    if let Some(max_iter) = args.max_iter {
        settings.training.max_iter = max_iter;
    }
    if let Some(alpha) = args.alpha {
        settings.training.alpha = alpha;
    }
    if let Some(beta) = args.beta {
        settings.training.beta = beta;
    }
    if let Some(seed) = args.seed {
        settings.training.seed = seed;
    }

    let corpus = read_corpus(&args.corpus)?;
    let labels_file = File::open(&args.labels)
        .with_context(|| format!("Failed to open {:?}", args.labels))?;
    let labels = format::read_labels(BufReader::new(labels_file), args.class_num)
        .with_context(|| format!("Failed to parse {:?}", args.labels))?;

    info!("Training configuration:");
    info!("  Documents: {}", corpus.len());
    info!("  Vocabulary: {}", corpus.vocab_size());
    info!("  Labels: {}", labels.class_num);
    info!("  Iterations: {}", settings.training.max_iter);
    info!("  Model directory: {}", settings.model_dir);

    let store = model_store(&settings);
    let mut classifier = LabeledLda::new(LldaParams::from(&settings))
        .context("Invalid hyperparameters")?
        .with_store(store);
    let token = classifier.cancellation_token();

    let mut handle = tokio::task::spawn_blocking(move || {
        classifier
            .fit_encoded(&corpus, &labels)
            .map(|model| model.likelihood().last().copied())
    });

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, stopping after the current sweep...");
            token.cancel();
            handle.await
        }
    };

    let final_likelihood = joined
        .context("Training task panicked")?
        .context("Training failed")?;
    if let Some(ll) = final_likelihood {
        info!("Final log-likelihood: {:.4}", ll);
    }
    info!("Model written to {}", settings.model_dir);
    Ok(())
}

fn stored_classifier(settings: &Settings) -> Result<LabeledLda> {
    Ok(LabeledLda::new(LldaParams::from(settings))
        .context("Invalid hyperparameters")?
        .with_store(model_store(settings)))
}

/// Infer topic probabilities for a corpus file.
pub async fn run_predict_proba(mut settings: Settings, args: PredictProbaArgs) -> Result<()> {
    apply_inference_overrides(&mut settings, &args.inference);
    let corpus = read_corpus(&args.corpus)?;
    let classifier = stored_classifier(&settings)?;

    let inference = tokio::task::spawn_blocking(move || classifier.predict_proba_encoded(&corpus))
        .await
        .context("Inference task panicked")?
        .context("Inference failed")?;

    let writer = output_writer(args.output.as_deref())?;
    format::write_matrix(writer, &inference.probabilities)
        .context("Failed to write probabilities")?;
    info!(
        documents = inference.stats.documents,
        oov_tokens = inference.stats.oov_tokens,
        "Wrote topic probabilities"
    );
    Ok(())
}

/// Infer and threshold labels for a corpus file.
pub async fn run_predict(mut settings: Settings, args: PredictArgs) -> Result<()> {
    apply_inference_overrides(&mut settings, &args.inference);
    if let Some(lambda) = args.lambda {
        settings.decision.lambda = lambda;
    }
    if let Some(format) = args.format {
        settings.decision.binarize = format == LabelFormat::Indicator;
    }
    let corpus = read_corpus(&args.corpus)?;
    let classifier = stored_classifier(&settings)?;

    let prediction = tokio::task::spawn_blocking(move || classifier.predict_encoded(&corpus))
        .await
        .context("Inference task panicked")?
        .context("Prediction failed")?;

    let writer = output_writer(args.output.as_deref())?;
    write_prediction(writer, &prediction).context("Failed to write labels")?;
    info!(documents = prediction.len(), "Wrote labels");
    Ok(())
}

/// Indicator rows as `0 1 0`, label lists as 1-indexed ids in rank order.
pub fn write_prediction<W: Write>(mut writer: W, prediction: &Prediction) -> io::Result<()> {
    match prediction {
        Prediction::Indicator(rows) => {
            for row in rows {
                let line: Vec<String> = row.iter().map(u8::to_string).collect();
                writeln!(writer, "{}", line.join(" "))?;
            }
        }
        Prediction::Labels(rows) => {
            for row in rows {
                let line: Vec<String> = row.iter().map(|l| (l + 1).to_string()).collect();
                writeln!(writer, "{}", line.join(" "))?;
            }
        }
    }
    writer.flush()
}

/// Print a summary of the stored model and the effective configuration.
pub fn show_model(settings: &Settings) -> Result<()> {
    let store = model_store(settings);
    println!("Model directory: {}", store.dir().display());
    if store.exists() {
        let model = store.load().context("Failed to load model")?;
        let meta = model.meta();
        println!("Status: fitted");
        println!("  Topics (class_num): {}", meta.class_num);
        println!("  Vocabulary: {}", meta.vocab_size);
        println!("  Training documents: {}", meta.n_docs);
        println!("  Iterations: {}", meta.max_iter);
        println!("  alpha: {}  beta: {}", meta.alpha, meta.beta);
        if let Some(ll) = model.likelihood().last() {
            println!("  Final log-likelihood: {:.4}", ll);
        }
    } else {
        println!("Status: not fitted");
    }
    println!();
    println!("Effective configuration:");
    print!(
        "{}",
        toml::to_string_pretty(settings).context("Failed to render configuration")?
    );
    Ok(())
}
