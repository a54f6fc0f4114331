//! # llda-engine
//!
//! Supervised multi-label topic modeling with Labeled LDA.
//!
//! ## Features
//! - Collapsed Gibbs sampling restricted to each document's label set
//! - Particle-filter inference of topic mixtures for unseen documents
//! - Boltzmann rank-threshold label decision with multi-label binarization
//! - Model artifact persistence (`lik`, `theta`, `n_mz`, `n_wz`, `phi`)
//!
//! ## Usage
//!
//! ```rust
//! use llda_engine::{LabeledLda, LldaParams};
//! use llda_types::CorpusInput;
//!
//! let mut params = LldaParams::default();
//! params.training.max_iter = 20;
//! params.inference.n_particles = 20;
//!
//! let mut clf = LabeledLda::new(params).unwrap();
//! let x = CorpusInput::Dense(vec![vec![2, 1, 0, 0], vec![0, 0, 1, 3], vec![1, 0, 1, 0]]);
//! let y = vec![vec![1, 0], vec![0, 1], vec![1, 1]];
//! clf.fit(&x, &y).unwrap();
//!
//! let probs = clf.predict_proba(&CorpusInput::Dense(vec![vec![1, 1, 0, 0]])).unwrap();
//! assert!(probs[0][0] > probs[0][1]);
//! ```

pub mod classifier;
pub mod decision;
pub mod inference;
pub mod model;
pub mod particle;
mod sampling;
pub mod store;
pub mod trainer;

pub use classifier::{LabeledLda, LldaParams, Prediction};
pub use decision::{boltzmann_pmf, decide, decide_all, BoltzmannThreshold};
pub use inference::{Inference, InferenceStats, ParticleFilter};
pub use model::{Model, ModelMeta};
pub use particle::{effective_sample_size, Particle, ParticlePopulation};
pub use store::{Artifact, ModelStore};
pub use trainer::Trainer;
