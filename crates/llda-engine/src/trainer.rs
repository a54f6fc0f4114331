//! Collapsed Gibbs sampling for Labeled LDA.
//!
//! Each document may only use the topics named by its label set. Per token,
//! the conditional over admissible topics is
//!
//! ```text
//! p(z = k) ∝ (n_mz[d,k] + α) · (n_wz[w,k] + β) / (n_z[k] + V·β)
//! ```
//!
//! and the run stops after exactly `max_iter` sweeps. Count tables have a
//! single writer; sweeps are strictly sequential.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use llda_types::{Corpus, LabelSet, LabelSets, LldaError, Result, TermId, TrainingConfig};

use crate::model::{Model, ModelMeta};
use crate::sampling::sample_index;

/// Fits a [`Model`] from a labeled corpus.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    cancel: CancellationToken,
}

/// Mutable sampler state; dropped unless every sweep completes.
struct SamplerState {
    n_topics: usize,
    vocab_size: usize,
    /// Flattened `V × K`.
    n_wz: Vec<u32>,
    /// Flattened `D × K`.
    n_mz: Vec<u32>,
    n_z: Vec<u32>,
    tokens: Vec<Vec<TermId>>,
    assignments: Vec<Vec<usize>>,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next iteration boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run `max_iter` Gibbs sweeps and return the fitted model.
    ///
    /// All inputs are validated before any count is touched; on error no
    /// model is produced.
    #[instrument(skip_all, fields(docs = corpus.len(), topics = labels.class_num))]
    pub fn train(&self, corpus: &Corpus, labels: &LabelSets) -> Result<Model> {
        self.validate(corpus, labels)?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut state = SamplerState::initialize(corpus, labels, &mut rng);
        let mut likelihood = Vec::with_capacity(self.config.max_iter);

        info!(
            docs = corpus.len(),
            tokens = corpus.token_count(),
            vocab = corpus.vocab_size(),
            max_iter = self.config.max_iter,
            "Starting L-LDA training"
        );

        for iteration in 0..self.config.max_iter {
            if self.cancel.is_cancelled() {
                info!(iteration, "Training cancelled");
                return Err(LldaError::Cancelled { iteration });
            }
            state.sweep(&labels.sets, self.config.alpha, self.config.beta, &mut rng);
            let ll = state.log_likelihood(&labels.sets, self.config.alpha, self.config.beta);
            debug!(iteration, log_likelihood = ll, "Gibbs sweep complete");
            likelihood.push(ll);
        }

        info!(
            log_likelihood = likelihood.last().copied().unwrap_or(f64::NAN),
            "L-LDA training complete"
        );

        let meta = ModelMeta {
            alpha: self.config.alpha,
            beta: self.config.beta,
            class_num: labels.class_num,
            vocab_size: corpus.vocab_size(),
            n_docs: corpus.len(),
            max_iter: self.config.max_iter,
        };
        let (n_wz, n_mz) = state.into_tables();
        Ok(Model::from_counts(
            meta,
            n_wz,
            n_mz,
            &labels.sets,
            likelihood,
        ))
    }

    fn validate(&self, corpus: &Corpus, labels: &LabelSets) -> Result<()> {
        self.config.validate().map_err(LldaError::InvalidInput)?;
        if corpus.len() != labels.len() {
            return Err(LldaError::mismatch(
                "label sets per document",
                corpus.len(),
                labels.len(),
            ));
        }
        if corpus.is_empty() {
            return Err(LldaError::InvalidInput(
                "training corpus has no documents".to_string(),
            ));
        }
        if corpus.vocab_size() == 0 {
            return Err(LldaError::InvalidInput(
                "training corpus has an empty vocabulary".to_string(),
            ));
        }
        if labels.class_num == 0 {
            return Err(LldaError::InvalidInput("class_num must be > 0".to_string()));
        }
        for (document, set) in labels.sets.iter().enumerate() {
            if set.is_empty() {
                return Err(LldaError::EmptyLabelSet { document });
            }
            if let Some(max) = set.max().filter(|&m| m >= labels.class_num) {
                return Err(LldaError::InvalidInput(format!(
                    "document {} carries label {} but class_num is {}",
                    document, max, labels.class_num
                )));
            }
        }
        Ok(())
    }
}

impl SamplerState {
    /// Assign every token a uniformly random admissible topic.
    fn initialize(corpus: &Corpus, labels: &LabelSets, rng: &mut StdRng) -> Self {
        let k = labels.class_num;
        let v = corpus.vocab_size();
        let mut state = Self {
            n_topics: k,
            vocab_size: v,
            n_wz: vec![0; v * k],
            n_mz: vec![0; corpus.len() * k],
            n_z: vec![0; k],
            tokens: Vec::with_capacity(corpus.len()),
            assignments: Vec::with_capacity(corpus.len()),
        };

        for (doc, (document, set)) in corpus.documents().iter().zip(&labels.sets).enumerate() {
            let admissible = set.as_slice();
            let tokens: Vec<TermId> = document.tokens().collect();
            let mut topics = Vec::with_capacity(tokens.len());
            for &term in &tokens {
                let topic = admissible[rng.random_range(0..admissible.len())];
                state.increment(doc, term, topic);
                topics.push(topic);
            }
            state.tokens.push(tokens);
            state.assignments.push(topics);
        }
        state
    }

    fn increment(&mut self, doc: usize, term: TermId, topic: usize) {
        self.n_wz[term * self.n_topics + topic] += 1;
        self.n_mz[doc * self.n_topics + topic] += 1;
        self.n_z[topic] += 1;
    }

    fn decrement(&mut self, doc: usize, term: TermId, topic: usize) {
        self.n_wz[term * self.n_topics + topic] -= 1;
        self.n_mz[doc * self.n_topics + topic] -= 1;
        self.n_z[topic] -= 1;
    }

    /// One full pass over every token of every document.
    fn sweep(&mut self, labels: &[LabelSet], alpha: f64, beta: f64, rng: &mut StdRng) {
        let k = self.n_topics;
        let v_beta = self.vocab_size as f64 * beta;
        let mut weights = Vec::with_capacity(k);

        for (doc, set) in labels.iter().enumerate() {
            let admissible = set.as_slice();
            for position in 0..self.tokens[doc].len() {
                let term = self.tokens[doc][position];
                let old = self.assignments[doc][position];
                self.decrement(doc, term, old);

                weights.clear();
                weights.extend(admissible.iter().map(|&topic| {
                    let doc_part = f64::from(self.n_mz[doc * k + topic]) + alpha;
                    let term_part = f64::from(self.n_wz[term * k + topic]) + beta;
                    doc_part * term_part / (f64::from(self.n_z[topic]) + v_beta)
                }));
                let topic = admissible[sample_index(rng, &weights)];

                self.increment(doc, term, topic);
                self.assignments[doc][position] = topic;
            }
        }
    }

    /// `Σ_tokens ln Σ_{k ∈ L_d} θ[d,k] · φ[k,w]` under the current counts.
    fn log_likelihood(&self, labels: &[LabelSet], alpha: f64, beta: f64) -> f64 {
        let k = self.n_topics;
        let v_beta = self.vocab_size as f64 * beta;
        let mut total = 0.0;
        for (doc, set) in labels.iter().enumerate() {
            let admissible = set.as_slice();
            let doc_len = self.tokens[doc].len() as f64;
            let theta_denom = doc_len + alpha * admissible.len() as f64;
            for &term in &self.tokens[doc] {
                let p: f64 = admissible
                    .iter()
                    .map(|&topic| {
                        let theta = (f64::from(self.n_mz[doc * k + topic]) + alpha) / theta_denom;
                        let phi = (f64::from(self.n_wz[term * k + topic]) + beta)
                            / (f64::from(self.n_z[topic]) + v_beta);
                        theta * phi
                    })
                    .sum();
                total += p.ln();
            }
        }
        total
    }

    /// Unflatten into `(n_wz: V × K, n_mz: D × K)`.
    fn into_tables(self) -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
        let k = self.n_topics;
        let rows = |flat: Vec<u32>| -> Vec<Vec<u32>> {
            if k == 0 {
                return Vec::new();
            }
            flat.chunks(k).map(<[u32]>::to_vec).collect()
        };
        (rows(self.n_wz), rows(self.n_mz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llda_types::{encode_corpus, encode_labels, CorpusInput};

    fn scenario() -> (Corpus, LabelSets) {
        let corpus = encode_corpus(&CorpusInput::Dense(vec![
            vec![2, 1, 0, 0],
            vec![0, 0, 1, 3],
            vec![1, 0, 1, 0],
        ]))
        .unwrap();
        let labels = encode_labels(&[vec![1, 0], vec![0, 1], vec![1, 1]], None).unwrap();
        (corpus, labels)
    }

    fn config(max_iter: usize) -> TrainingConfig {
        TrainingConfig {
            max_iter,
            alpha: 0.1,
            beta: 0.1,
            seed: 3,
        }
    }

    #[test]
    fn test_label_mask_holds_exactly() {
        let (corpus, labels) = scenario();
        let model = Trainer::new(config(50)).train(&corpus, &labels).unwrap();

        assert_eq!(model.theta()[0][1], 0.0);
        assert_eq!(model.theta()[0][0], 1.0);
        assert_eq!(model.theta()[1][0], 0.0);
        assert_eq!(model.theta()[1][1], 1.0);
        // single-label documents keep every token on their one topic
        assert_eq!(model.n_mz()[0], vec![3, 0]);
        assert_eq!(model.n_mz()[1], vec![0, 4]);
    }

    #[test]
    fn test_distributions_normalized() {
        let (corpus, labels) = scenario();
        let model = Trainer::new(config(20)).train(&corpus, &labels).unwrap();
        for row in model.phi().iter().chain(model.theta()) {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row sums to {sum}");
        }
    }

    #[test]
    fn test_counts_conserve_tokens() {
        let (corpus, labels) = scenario();
        let model = Trainer::new(config(10)).train(&corpus, &labels).unwrap();
        let total_wz: u32 = model.n_wz().iter().flatten().sum();
        let total_mz: u32 = model.n_mz().iter().flatten().sum();
        assert_eq!(total_wz as usize, corpus.token_count());
        assert_eq!(total_mz as usize, corpus.token_count());
        // term 1 only ever occurs in document 0, which is confined to topic 0
        assert_eq!(model.n_wz()[1], vec![1, 0]);
    }

    #[test]
    fn test_likelihood_trace_per_iteration() {
        let (corpus, labels) = scenario();
        let model = Trainer::new(config(7)).train(&corpus, &labels).unwrap();
        assert_eq!(model.likelihood().len(), 7);
        assert!(model.likelihood().iter().all(|ll| ll.is_finite() && *ll < 0.0));
    }

    #[test]
    fn test_same_seed_same_model() {
        let (corpus, labels) = scenario();
        let a = Trainer::new(config(15)).train(&corpus, &labels).unwrap();
        let b = Trainer::new(config(15)).train(&corpus, &labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_label_set_rejected() {
        let (corpus, _) = scenario();
        let labels = encode_labels(&[vec![1, 0], vec![0, 0], vec![1, 1]], None).unwrap();
        let err = Trainer::new(config(5)).train(&corpus, &labels).unwrap_err();
        assert!(matches!(err, LldaError::EmptyLabelSet { document: 1 }));
    }

    #[test]
    fn test_document_count_mismatch() {
        let (corpus, _) = scenario();
        let labels = encode_labels(&[vec![1, 0], vec![0, 1]], None).unwrap();
        let err = Trainer::new(config(5)).train(&corpus, &labels).unwrap_err();
        assert!(matches!(
            err,
            LldaError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let corpus = encode_corpus(&CorpusInput::Dense(vec![vec![], vec![]])).unwrap();
        let labels = encode_labels(&[vec![1, 0], vec![0, 1]], None).unwrap();
        assert_eq!(corpus.vocab_size(), 0);
        let err = Trainer::new(config(5)).train(&corpus, &labels).unwrap_err();
        assert!(matches!(err, LldaError::InvalidInput(_)), "{:?}", err);
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let (corpus, labels) = scenario();
        let mut bad = config(5);
        bad.beta = -1.0;
        let err = Trainer::new(bad).train(&corpus, &labels).unwrap_err();
        assert!(matches!(err, LldaError::InvalidInput(_)));
    }

    #[test]
    fn test_cancelled_before_first_sweep() {
        let (corpus, labels) = scenario();
        let token = CancellationToken::new();
        token.cancel();
        let err = Trainer::new(config(5))
            .with_cancellation(token)
            .train(&corpus, &labels)
            .unwrap_err();
        assert!(matches!(err, LldaError::Cancelled { iteration: 0 }));
    }

    #[test]
    fn test_empty_document_is_allowed() {
        let corpus = encode_corpus(&CorpusInput::Dense(vec![vec![1, 1], vec![0, 0]])).unwrap();
        let labels = encode_labels(&[vec![1, 0], vec![0, 1]], None).unwrap();
        let model = Trainer::new(config(3)).train(&corpus, &labels).unwrap();
        assert_eq!(model.theta()[1], vec![0.0, 1.0]);
    }
}
