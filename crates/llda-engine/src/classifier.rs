//! Estimator-style facade: `fit`, `predict_proba`, `predict`.
//!
//! Orchestration only. Inputs are encoded, handed to the [`Trainer`],
//! [`ParticleFilter`] and [`BoltzmannThreshold`], and the fitted model is kept
//! in memory and optionally mirrored to a [`ModelStore`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use llda_types::{
    binarize, encode_corpus, encode_labels, Corpus, CorpusInput, DecisionConfig,
    InferenceConfig, LabelId, LabelSet, LabelSets, LldaError, Result, Settings, TrainingConfig,
};

use crate::decision::BoltzmannThreshold;
use crate::inference::{Inference, ParticleFilter};
use crate::model::Model;
use crate::store::ModelStore;
use crate::trainer::Trainer;

/// Every hyperparameter the estimator recognises.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LldaParams {
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
}

impl LldaParams {
    pub fn validate(&self) -> Result<()> {
        self.training.validate().map_err(LldaError::InvalidInput)?;
        self.inference.validate().map_err(LldaError::InvalidInput)?;
        self.decision.validate().map_err(LldaError::InvalidInput)?;
        Ok(())
    }
}

impl From<&Settings> for LldaParams {
    fn from(settings: &Settings) -> Self {
        Self {
            training: settings.training.clone(),
            inference: settings.inference.clone(),
            decision: settings.decision.clone(),
        }
    }
}

/// Output of [`LabeledLda::predict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// Dense 0/1 rows of width `class_num`.
    Indicator(Vec<Vec<u8>>),
    /// Accepted label ids per document, highest probability first.
    Labels(Vec<Vec<LabelId>>),
}

impl Prediction {
    pub fn len(&self) -> usize {
        match self {
            Prediction::Indicator(rows) => rows.len(),
            Prediction::Labels(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label sets regardless of representation.
    pub fn label_sets(&self) -> Vec<LabelSet> {
        match self {
            Prediction::Labels(rows) => rows.iter().map(|r| LabelSet::new(r.iter().copied())).collect(),
            Prediction::Indicator(rows) => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .filter(|&(_, &v)| v == 1)
                        .map(|(label, _)| label)
                        .collect()
                })
                .collect(),
        }
    }
}

/// Labeled LDA classifier.
#[derive(Debug, Clone)]
pub struct LabeledLda {
    params: LldaParams,
    model: Option<Model>,
    store: Option<ModelStore>,
    cancel: CancellationToken,
}

impl LabeledLda {
    pub fn new(params: LldaParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            model: None,
            store: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Mirror fitted models to `store` and fall back to it when no model is
    /// held in memory.
    pub fn with_store(mut self, store: ModelStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Cancel this token to stop an in-flight `fit` at the next sweep.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn params(&self) -> &LldaParams {
        &self.params
    }

    /// Replace the hyperparameters. The fitted model, if any, is kept.
    pub fn set_params(&mut self, params: LldaParams) -> Result<&mut Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    /// `class_num` recorded by the last successful fit.
    pub fn class_num(&self) -> Option<usize> {
        self.model.as_ref().map(Model::class_num)
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some() || self.store.as_ref().is_some_and(ModelStore::exists)
    }

    /// Fit from a document matrix and a binary label matrix.
    pub fn fit(&mut self, x: &CorpusInput, y: &[Vec<u8>]) -> Result<&Model> {
        let corpus = encode_corpus(x)?;
        let labels = encode_labels(y, None)?;
        self.fit_encoded(&corpus, &labels)
    }

    /// Fit from an already encoded corpus and label sets.
    ///
    /// The new model replaces the previous one only after training (and
    /// saving, with a store attached) succeeded.
    pub fn fit_encoded(&mut self, corpus: &Corpus, labels: &LabelSets) -> Result<&Model> {
        let trainer =
            Trainer::new(self.params.training.clone()).with_cancellation(self.cancel.clone());
        let model = trainer.train(corpus, labels)?;
        if let Some(store) = &self.store {
            store.save(&model)?;
        }
        info!(class_num = model.class_num(), "Model fitted");
        Ok(self.model.insert(model))
    }

    /// The fitted model, from memory or the attached store.
    pub fn model(&self) -> Result<Cow<'_, Model>> {
        if let Some(model) = &self.model {
            return Ok(Cow::Borrowed(model));
        }
        match &self.store {
            Some(store) => store.load().map(Cow::Owned),
            None => Err(LldaError::ModelNotFitted(
                "call fit before predicting".to_string(),
            )),
        }
    }

    /// Per-document topic probabilities, rows in input order.
    pub fn predict_proba(&self, x: &CorpusInput) -> Result<Vec<Vec<f64>>> {
        let corpus = encode_corpus(x)?;
        Ok(self.predict_proba_encoded(&corpus)?.probabilities)
    }

    pub fn predict_proba_encoded(&self, corpus: &Corpus) -> Result<Inference> {
        let model = self.model()?;
        ParticleFilter::new(self.params.inference.clone()).infer(&model, corpus)
    }

    /// Thresholded labels per document.
    pub fn predict(&self, x: &CorpusInput) -> Result<Prediction> {
        let corpus = encode_corpus(x)?;
        self.predict_encoded(&corpus)
    }

    pub fn predict_encoded(&self, corpus: &Corpus) -> Result<Prediction> {
        let model = self.model()?;
        let class_num = model.class_num();
        let inference = ParticleFilter::new(self.params.inference.clone()).infer(&model, corpus)?;
        self.decide(&inference.probabilities, class_num)
    }

    /// Apply the label decision to a probability matrix.
    pub fn decide(&self, probabilities: &[Vec<f64>], class_num: usize) -> Result<Prediction> {
        let threshold = BoltzmannThreshold::new(self.params.decision.lambda, class_num)?;
        let ranked = probabilities
            .iter()
            .map(|row| threshold.decide_ranked(row))
            .collect::<Result<Vec<_>>>()?;

        let unlabeled = ranked.iter().filter(|r| r.is_empty()).count();
        if unlabeled > 0 {
            warn!(documents = unlabeled, "Documents received no label");
        }

        if self.params.decision.binarize {
            let sets: Vec<LabelSet> = ranked.into_iter().map(LabelSet::new).collect();
            Ok(Prediction::Indicator(binarize(&sets, class_num)))
        } else {
            Ok(Prediction::Labels(ranked))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params() -> LldaParams {
        LldaParams {
            training: TrainingConfig {
                max_iter: 30,
                ..TrainingConfig::default()
            },
            inference: InferenceConfig {
                n_particles: 30,
                ess_threshold: 15,
                rejuvenation_period: 4,
                ..InferenceConfig::default()
            },
            decision: DecisionConfig::default(),
        }
    }

    fn train_x() -> CorpusInput {
        CorpusInput::Dense(vec![
            vec![3, 2, 0, 0, 0],
            vec![0, 0, 3, 3, 0],
            vec![2, 0, 0, 0, 3],
            vec![0, 1, 2, 0, 0],
        ])
    }

    fn train_y() -> Vec<Vec<u8>> {
        vec![
            vec![1, 0, 0],
            vec![0, 1, 0],
            vec![0, 0, 1],
            vec![1, 1, 0],
        ]
    }

    #[test]
    fn test_predict_before_fit() {
        let clf = LabeledLda::new(params()).unwrap();
        let err = clf
            .predict_proba(&CorpusInput::Dense(vec![vec![1, 0, 0, 0, 0]]))
            .unwrap_err();
        assert!(matches!(err, LldaError::ModelNotFitted(_)));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn test_fit_records_class_num() {
        let mut clf = LabeledLda::new(params()).unwrap();
        clf.fit(&train_x(), &train_y()).unwrap();
        assert_eq!(clf.class_num(), Some(3));
        assert!(clf.is_fitted());
    }

    #[test]
    fn test_predict_indicator_and_labels() {
        let mut clf = LabeledLda::new(params()).unwrap();
        clf.fit(&train_x(), &train_y()).unwrap();
        let x = CorpusInput::Dense(vec![vec![4, 2, 0, 0, 0], vec![0, 0, 0, 0, 5]]);

        let indicator = clf.predict(&x).unwrap();
        match &indicator {
            Prediction::Indicator(rows) => {
                assert_eq!(rows.len(), 2);
                assert!(rows.iter().all(|r| r.len() == 3));
            }
            other => panic!("expected indicator rows, got {other:?}"),
        }

        let mut ids = params();
        ids.decision.binarize = false;
        clf.set_params(ids).unwrap();
        let labels = clf.predict(&x).unwrap();
        assert!(matches!(labels, Prediction::Labels(_)));
        assert_eq!(labels.label_sets(), indicator.label_sets());
    }

    #[test]
    fn test_set_params_validates() {
        let mut clf = LabeledLda::new(params()).unwrap();
        let mut bad = params();
        bad.inference.ess_threshold = 0;
        assert!(clf.set_params(bad).is_err());
        assert_eq!(clf.params().inference.ess_threshold, 15);
    }

    #[test]
    fn test_failed_fit_keeps_previous_model() {
        let mut clf = LabeledLda::new(params()).unwrap();
        clf.fit(&train_x(), &train_y()).unwrap();
        let mut y = train_y();
        y[2] = vec![0, 0, 0];
        let err = clf.fit(&train_x(), &y).unwrap_err();
        assert!(matches!(err, LldaError::EmptyLabelSet { document: 2 }));
        assert_eq!(clf.class_num(), Some(3));
    }

    #[test]
    fn test_store_backed_prediction() {
        let dir = TempDir::new().unwrap();
        let mut trained = LabeledLda::new(params())
            .unwrap()
            .with_store(ModelStore::new(dir.path(), "fit"));
        trained.fit(&train_x(), &train_y()).unwrap();

        let fresh = LabeledLda::new(params())
            .unwrap()
            .with_store(ModelStore::new(dir.path(), "fit"));
        assert!(fresh.is_fitted());
        let x = CorpusInput::Dense(vec![vec![1, 1, 0, 0, 0]]);
        assert_eq!(
            fresh.predict_proba(&x).unwrap(),
            trained.predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn test_cancelled_fit_leaves_no_model() {
        let mut clf = LabeledLda::new(params()).unwrap();
        clf.cancellation_token().cancel();
        let err = clf.fit(&train_x(), &train_y()).unwrap_err();
        assert!(matches!(err, LldaError::Cancelled { .. }));
        assert!(!clf.is_fitted());
    }
}
