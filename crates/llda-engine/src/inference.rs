//! Streaming topic inference with a particle filter.
//!
//! Each document is processed independently against a fixed [`Model`]:
//! every observed token extends each particle's assignment history, weights
//! are updated by the token's likelihood, the population is resampled when
//! the effective sample size collapses, and every `rejuvenation_period`
//! tokens each particle gets one Gibbs sweep over its own history.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use llda_types::{Corpus, Document, InferenceConfig, LldaError, ProposalKind, Result, TermId};

use crate::model::Model;
use crate::particle::{Particle, ParticlePopulation};
use crate::sampling::{sample_index, stream_seed};

/// Counters gathered while inferring a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub documents: usize,
    /// In-vocabulary tokens processed.
    pub tokens: usize,
    /// Tokens skipped because their term is unknown to the model.
    pub oov_tokens: usize,
    pub resamples: usize,
    pub rejuvenations: usize,
}

impl InferenceStats {
    fn merge(mut self, other: Self) -> Self {
        self.documents += other.documents;
        self.tokens += other.tokens;
        self.oov_tokens += other.oov_tokens;
        self.resamples += other.resamples;
        self.rejuvenations += other.rejuvenations;
        self
    }
}

/// Output of a batch: one topic-probability row per input document.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub probabilities: Vec<Vec<f64>>,
    pub stats: InferenceStats,
}

/// Read-only per-batch view of the model.
struct ModelView {
    n_topics: usize,
    vocab_size: usize,
    alpha: f64,
    /// `phi` term-major: `phi[k, w]` at `w * K + k`.
    phi: Vec<f64>,
}

impl ModelView {
    fn new(model: &Model) -> Self {
        Self {
            n_topics: model.class_num(),
            vocab_size: model.vocab_size(),
            alpha: model.alpha(),
            phi: model.term_topic_table(),
        }
    }

    fn phi_column(&self, term: TermId) -> &[f64] {
        &self.phi[term * self.n_topics..(term + 1) * self.n_topics]
    }
}

/// Sequential Monte Carlo inferencer.
#[derive(Debug, Clone)]
pub struct ParticleFilter {
    config: InferenceConfig,
}

impl ParticleFilter {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Infer topic probabilities for every document of `corpus`.
    ///
    /// Row order matches document order. Documents never share mutable
    /// state, so they run on the rayon pool when `parallel` is set; each
    /// document draws from its own seeded stream so results do not depend
    /// on scheduling.
    pub fn infer(&self, model: &Model, corpus: &Corpus) -> Result<Inference> {
        self.config.validate().map_err(LldaError::InvalidInput)?;
        if model.class_num() == 0 {
            return Err(LldaError::ModelNotFitted(
                "model has no topics".to_string(),
            ));
        }

        let view = ModelView::new(model);
        info!(
            docs = corpus.len(),
            particles = self.config.n_particles,
            topics = view.n_topics,
            "Starting particle filter inference"
        );

        let run = |(index, document): (usize, &Document)| {
            let mut rng = StdRng::seed_from_u64(stream_seed(self.config.seed, index));
            self.infer_document(&view, index, document, &mut rng)
        };

        let results: Vec<(Vec<f64>, InferenceStats)> = if self.config.parallel {
            corpus.documents().par_iter().enumerate().map(run).collect()
        } else {
            corpus.documents().iter().enumerate().map(run).collect()
        };

        let mut probabilities = Vec::with_capacity(results.len());
        let mut stats = InferenceStats::default();
        for (row, doc_stats) in results {
            probabilities.push(row);
            stats = stats.merge(doc_stats);
        }

        if stats.oov_tokens > 0 {
            warn!(
                oov_tokens = stats.oov_tokens,
                "Skipped tokens outside the training vocabulary"
            );
        }
        info!(
            tokens = stats.tokens,
            resamples = stats.resamples,
            rejuvenations = stats.rejuvenations,
            "Particle filter inference complete"
        );

        Ok(Inference {
            probabilities,
            stats,
        })
    }

    #[instrument(skip_all, fields(document = index))]
    fn infer_document(
        &self,
        view: &ModelView,
        index: usize,
        document: &Document,
        rng: &mut StdRng,
    ) -> (Vec<f64>, InferenceStats) {
        let k = view.n_topics;
        let alpha = view.alpha;
        let k_alpha = k as f64 * alpha;
        let mut population = ParticlePopulation::new(self.config.n_particles, k);
        let mut history: Vec<TermId> = Vec::with_capacity(document.token_count());
        let mut stats = InferenceStats {
            documents: 1,
            ..InferenceStats::default()
        };
        let mut weights = Vec::with_capacity(k);

        for term in document.tokens() {
            if term >= view.vocab_size {
                stats.oov_tokens += 1;
                continue;
            }
            let phi = view.phi_column(term);
            let seen = history.len() as f64;
            history.push(term);
            stats.tokens += 1;

            for (particle, weight) in population.slots_mut() {
                weights.clear();
                let likelihood = match self.config.proposal {
                    ProposalKind::Guided => {
                        weights.extend(
                            particle
                                .counts()
                                .iter()
                                .zip(phi)
                                .map(|(&c, &p)| (f64::from(c) + alpha) * p),
                        );
                        let topic = sample_index(rng, &weights);
                        let predictive = weights.iter().sum::<f64>() / (seen + k_alpha);
                        particle.push(topic);
                        predictive
                    }
                    ProposalKind::Bootstrap => {
                        weights.extend(particle.counts().iter().map(|&c| f64::from(c) + alpha));
                        let topic = sample_index(rng, &weights);
                        particle.push(topic);
                        phi[topic]
                    }
                };
                *weight *= likelihood;
            }

            if !population.normalize() {
                warn!(document = index, "Particle weights vanished; reset to uniform");
            }

            if population.needs_resample(self.config.ess_threshold) {
                population.resample(rng);
                stats.resamples += 1;
            }

            if history.len() % self.config.rejuvenation_period == 0 {
                for particle in population.particles_mut() {
                    rejuvenate(particle, &history, view, rng, &mut weights);
                }
                stats.rejuvenations += 1;
            }
        }

        debug!(
            tokens = stats.tokens,
            oov = stats.oov_tokens,
            resamples = stats.resamples,
            ess = population.effective_sample_size(),
            "Document inferred"
        );
        (population.topic_distribution(alpha), stats)
    }
}

/// One Gibbs sweep over a particle's own history against the fixed model.
fn rejuvenate(
    particle: &mut Particle,
    history: &[TermId],
    view: &ModelView,
    rng: &mut StdRng,
    weights: &mut Vec<f64>,
) {
    for (position, &term) in history.iter().enumerate() {
        particle.withdraw(position);
        weights.clear();
        weights.extend(
            particle
                .counts()
                .iter()
                .zip(view.phi_column(term))
                .map(|(&c, &p)| (f64::from(c) + view.alpha) * p),
        );
        let topic = sample_index(rng, weights);
        particle.restore(position, topic);
    }
}
