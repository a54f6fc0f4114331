//! The fitted L-LDA model.
//!
//! A [`Model`] is produced once by the trainer (or reloaded from artifacts)
//! and is read-only afterwards. Inference only borrows it.

use serde::{Deserialize, Serialize};

use llda_types::{LabelSet, LldaError, Result};

/// Scalar facts about a fitted model, persisted as `<prefix>.meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub alpha: f64,
    pub beta: f64,
    /// Topic count K (one topic per label).
    pub class_num: usize,
    /// Vocabulary size V.
    pub vocab_size: usize,
    /// Training documents D.
    pub n_docs: usize,
    pub max_iter: usize,
}

/// Count tables, normalized distributions and the training trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    meta: ModelMeta,
    /// `V × K` term-topic counts.
    n_wz: Vec<Vec<u32>>,
    /// `D × K` document-topic counts.
    n_mz: Vec<Vec<u32>>,
    /// `K × V` topic-term distribution.
    phi: Vec<Vec<f64>>,
    /// `D × K` document-topic distribution.
    theta: Vec<Vec<f64>>,
    /// One log-likelihood per Gibbs sweep.
    likelihood: Vec<f64>,
}

impl Model {
    /// Derive `phi` and `theta` from final training counts.
    ///
    /// `theta` is smoothed over each document's admissible topics only, so
    /// topics outside a document's label set get exactly zero mass.
    pub(crate) fn from_counts(
        meta: ModelMeta,
        n_wz: Vec<Vec<u32>>,
        n_mz: Vec<Vec<u32>>,
        labels: &[LabelSet],
        likelihood: Vec<f64>,
    ) -> Self {
        let k = meta.class_num;
        let v = meta.vocab_size;

        let mut n_z = vec![0u64; k];
        for row in &n_wz {
            for (topic, &count) in row.iter().enumerate() {
                n_z[topic] += u64::from(count);
            }
        }

        let phi = (0..k)
            .map(|topic| {
                let denom = n_z[topic] as f64 + v as f64 * meta.beta;
                (0..v)
                    .map(|term| (f64::from(n_wz[term][topic]) + meta.beta) / denom)
                    .collect()
            })
            .collect();

        let theta = n_mz
            .iter()
            .zip(labels)
            .map(|(counts, set)| smoothed_masked_row(counts, set, meta.alpha))
            .collect();

        Self {
            meta,
            n_wz,
            n_mz,
            phi,
            theta,
            likelihood,
        }
    }

    /// Assemble a model from reloaded artifacts, checking every shape.
    pub fn from_parts(
        meta: ModelMeta,
        n_wz: Vec<Vec<u32>>,
        n_mz: Vec<Vec<u32>>,
        phi: Vec<Vec<f64>>,
        theta: Vec<Vec<f64>>,
        likelihood: Vec<f64>,
    ) -> Result<Self> {
        let (k, v, d) = (meta.class_num, meta.vocab_size, meta.n_docs);
        check_shape("n_wz", &n_wz, v, k)?;
        check_shape("n_mz", &n_mz, d, k)?;
        check_shape("phi", &phi, k, v)?;
        check_shape("theta", &theta, d, k)?;
        if !(meta.alpha > 0.0 && meta.beta > 0.0) {
            return Err(LldaError::InvalidInput(format!(
                "model hyperparameters must be positive (alpha={}, beta={})",
                meta.alpha, meta.beta
            )));
        }
        Ok(Self {
            meta,
            n_wz,
            n_mz,
            phi,
            theta,
            likelihood,
        })
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn alpha(&self) -> f64 {
        self.meta.alpha
    }

    pub fn beta(&self) -> f64 {
        self.meta.beta
    }

    /// Number of topics (= labels).
    pub fn class_num(&self) -> usize {
        self.meta.class_num
    }

    pub fn vocab_size(&self) -> usize {
        self.meta.vocab_size
    }

    pub fn n_wz(&self) -> &[Vec<u32>] {
        &self.n_wz
    }

    pub fn n_mz(&self) -> &[Vec<u32>] {
        &self.n_mz
    }

    pub fn phi(&self) -> &[Vec<f64>] {
        &self.phi
    }

    pub fn theta(&self) -> &[Vec<f64>] {
        &self.theta
    }

    pub fn likelihood(&self) -> &[f64] {
        &self.likelihood
    }

    /// `phi` laid out term-major (`V × K`, flattened) for per-token lookups.
    pub(crate) fn term_topic_table(&self) -> Vec<f64> {
        let k = self.class_num();
        let mut table = vec![0.0; self.vocab_size() * k];
        for (topic, row) in self.phi.iter().enumerate() {
            for (term, &p) in row.iter().enumerate() {
                table[term * k + topic] = p;
            }
        }
        table
    }
}

/// `(n + alpha) / (N + alpha * |L|)` on admissible topics, zero elsewhere.
fn smoothed_masked_row(counts: &[u32], set: &LabelSet, alpha: f64) -> Vec<f64> {
    let mask = set.mask(counts.len());
    let admissible = mask.iter().filter(|&&m| m).count();
    let total: f64 = counts
        .iter()
        .zip(&mask)
        .filter(|&(_, &m)| m)
        .map(|(&c, _)| f64::from(c))
        .sum();
    let denom = total + alpha * admissible as f64;
    counts
        .iter()
        .zip(&mask)
        .map(|(&c, &m)| if m { (f64::from(c) + alpha) / denom } else { 0.0 })
        .collect()
}

fn check_shape<T>(what: &str, rows: &[Vec<T>], n_rows: usize, n_cols: usize) -> Result<()> {
    if rows.len() != n_rows {
        return Err(LldaError::mismatch(format!("{} rows", what), n_rows, rows.len()));
    }
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        return Err(LldaError::mismatch(
            format!("{} row {} width", what, index),
            n_cols,
            row.len(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ModelMeta {
        ModelMeta {
            alpha: 0.1,
            beta: 0.1,
            class_num: 2,
            vocab_size: 3,
            n_docs: 2,
            max_iter: 1,
        }
    }

    fn toy_model() -> Model {
        let n_wz = vec![vec![2, 0], vec![1, 1], vec![0, 3]];
        let n_mz = vec![vec![3, 0], vec![0, 4]];
        let labels = [LabelSet::new([0]), LabelSet::new([0, 1])];
        Model::from_counts(meta(), n_wz, n_mz, &labels, vec![-4.0])
    }

    #[test]
    fn test_phi_rows_normalized() {
        let model = toy_model();
        for row in model.phi() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        // topic 0: counts [2,1,0], denom 3 + 0.3
        assert!((model.phi()[0][0] - 2.1 / 3.3).abs() < 1e-12);
    }

    #[test]
    fn test_theta_masked_exactly() {
        let model = toy_model();
        assert_eq!(model.theta()[0][1], 0.0);
        assert_eq!(model.theta()[0][0], 1.0);
        let sum: f64 = model.theta()[1].iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((model.theta()[1][1] - 4.1 / 4.2).abs() < 1e-12);
    }

    #[test]
    fn test_term_topic_table_transposes_phi() {
        let model = toy_model();
        let table = model.term_topic_table();
        assert_eq!(table[2 * 2 + 1], model.phi()[1][2]);
        assert_eq!(table[0], model.phi()[0][0]);
    }

    #[test]
    fn test_from_parts_checks_shapes() {
        let model = toy_model();
        let mut phi = model.phi().to_vec();
        phi[1].pop();
        let err = Model::from_parts(
            meta(),
            model.n_wz().to_vec(),
            model.n_mz().to_vec(),
            phi,
            model.theta().to_vec(),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LldaError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }
}
