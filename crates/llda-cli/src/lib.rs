//! `llda` command-line library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (fit, predict-proba, predict, inspect)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, FitArgs, InferenceArgs, LabelFormat, PredictArgs, PredictProbaArgs};
pub use commands::{
    init_logging, load_settings, run_fit, run_predict, run_predict_proba, show_model,
    write_prediction,
};
