//! Configuration loading for labeled-lda.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/labeled-lda/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::LldaError;

/// Gibbs sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of full Gibbs sweeps over the corpus.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Document-topic Dirichlet smoothing.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Topic-term Dirichlet smoothing.
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// RNG seed for topic initialisation and sampling.
    #[serde(default)]
    pub seed: u64,
}

fn default_max_iter() -> usize {
    100
}

fn default_alpha() -> f64 {
    0.1
}

fn default_beta() -> f64 {
    0.1
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            alpha: default_alpha(),
            beta: default_beta(),
            seed: 0,
        }
    }
}

impl TrainingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iter == 0 {
            return Err("max_iter must be > 0".to_string());
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(format!("alpha must be > 0, got {}", self.alpha));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(format!("beta must be > 0, got {}", self.beta));
        }
        Ok(())
    }
}

/// How a particle proposes the topic of a newly observed token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// Sample from the particle's topic prior combined with `phi[., term]`;
    /// weight by the marginal predictive likelihood of the term.
    #[default]
    Guided,
    /// Sample from the particle's smoothed topic prior alone;
    /// weight by `phi[topic, term]`.
    Bootstrap,
}

/// Particle filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Particles per document.
    #[serde(default = "default_n_particles")]
    pub n_particles: usize,

    /// Resample when the effective sample size drops below this.
    #[serde(default = "default_ess_threshold")]
    pub ess_threshold: usize,

    /// Run a rejuvenation sweep every this many tokens.
    #[serde(default = "default_rejuvenation_period")]
    pub rejuvenation_period: usize,

    #[serde(default)]
    pub proposal: ProposalKind,

    #[serde(default)]
    pub seed: u64,

    /// Infer documents on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_n_particles() -> usize {
    100
}

fn default_ess_threshold() -> usize {
    10
}

fn default_rejuvenation_period() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            n_particles: default_n_particles(),
            ess_threshold: default_ess_threshold(),
            rejuvenation_period: default_rejuvenation_period(),
            proposal: ProposalKind::default(),
            seed: 0,
            parallel: default_true(),
        }
    }
}

impl InferenceConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_particles == 0 {
            return Err("n_particles must be > 0".to_string());
        }
        if self.ess_threshold == 0 || self.ess_threshold > self.n_particles {
            return Err(format!(
                "ess_threshold must be 1..={}, got {}",
                self.n_particles, self.ess_threshold
            ));
        }
        if self.rejuvenation_period == 0 {
            return Err("rejuvenation_period must be > 0".to_string());
        }
        Ok(())
    }
}

/// Label decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Boltzmann shape parameter for the rank threshold curve.
    #[serde(default = "default_lambda")]
    pub lambda: f64,

    /// Emit dense 0/1 indicator rows of width `class_num` instead of
    /// ranked label-id lists.
    #[serde(default = "default_true")]
    pub binarize: bool,
}

fn default_lambda() -> f64 {
    0.5
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            binarize: default_true(),
        }
    }
}

impl DecisionConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(format!("lambda must be > 0, got {}", self.lambda));
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding fitted model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// File name prefix for model artifacts (`<prefix>.phi`, ...)
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub decision: DecisionConfig,
}

fn default_model_dir() -> String {
    ProjectDirs::from("", "", "labeled-lda")
        .map(|p| p.data_local_dir().join("model"))
        .unwrap_or_else(|| PathBuf::from("/tmp/labeled_lda"))
        .to_string_lossy()
        .to_string()
}

fn default_artifact_prefix() -> String {
    "fit".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            artifact_prefix: default_artifact_prefix(),
            log_level: default_log_level(),
            training: TrainingConfig::default(),
            inference: InferenceConfig::default(),
            decision: DecisionConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/labeled-lda/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (LLDA_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, LldaError> {
        let config_dir = ProjectDirs::from("", "", "labeled-lda")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("model_dir", default_model_dir())
            .map_err(|e| LldaError::Config(e.to_string()))?
            .set_default("artifact_prefix", default_artifact_prefix())
            .map_err(|e| LldaError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| LldaError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: LLDA_LOG_LEVEL, LLDA_TRAINING__ALPHA, LLDA_INFERENCE__N_PARTICLES, ...
        builder = builder.add_source(
            Environment::with_prefix("LLDA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| LldaError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| LldaError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), LldaError> {
        self.training.validate().map_err(LldaError::Config)?;
        self.inference.validate().map_err(LldaError::Config)?;
        self.decision.validate().map_err(LldaError::Config)?;
        Ok(())
    }

    /// Expand ~ in model_dir to the actual home directory
    pub fn expanded_model_dir(&self) -> PathBuf {
        if let Some(rest) = self.model_dir.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new() {
                return home.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.model_dir)
    }
}
