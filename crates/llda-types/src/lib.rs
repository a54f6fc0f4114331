//! # llda-types
//!
//! Shared domain types for labeled topic modeling.
//!
//! This crate defines the data structures used throughout the workspace:
//! - Corpus: immutable sparse document-term collections
//! - Labels: per-document label sets and multi-label binarization
//! - Format: the line-oriented interchange files
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use llda_types::{encode_corpus, CorpusInput};
//!
//! let corpus = encode_corpus(&CorpusInput::Dense(vec![vec![2, 1, 0], vec![0, 0, 3]])).unwrap();
//! assert_eq!(corpus.len(), 2);
//! assert_eq!(corpus.vocab_size(), 3);
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod format;
pub mod labels;

pub use config::{DecisionConfig, InferenceConfig, ProposalKind, Settings, TrainingConfig};
pub use corpus::{encode_corpus, Corpus, CorpusInput, Document, TermId};
pub use error::{LldaError, Result};
pub use labels::{binarize, encode_labels, LabelId, LabelSet, LabelSets};
