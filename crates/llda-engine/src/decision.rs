//! Label decision from topic probabilities.
//!
//! Topics are ranked by probability and the topic at rank `j` is accepted iff
//! its probability strictly exceeds the Boltzmann PMF at `j`:
//!
//! ```text
//! b(j) = (1 - e^{-λ}) · e^{-λ j} / (1 - e^{-λ K}),   j = 0..K-1
//! ```
//!
//! Ranking carries the sorting permutation, so tied probabilities resolve to
//! the lower topic id first.

use llda_types::{LabelId, LabelSet, LldaError, Result};

/// Precomputed rank threshold curve for `K` states.
#[derive(Debug, Clone, PartialEq)]
pub struct BoltzmannThreshold {
    lambda: f64,
    curve: Vec<f64>,
}

impl BoltzmannThreshold {
    pub fn new(lambda: f64, n_states: usize) -> Result<Self> {
        if !(lambda.is_finite() && lambda > 0.0) {
            return Err(LldaError::InvalidInput(format!(
                "lambda must be a positive real, got {}",
                lambda
            )));
        }
        let curve = (0..n_states)
            .map(|rank| boltzmann_pmf(rank, lambda, n_states))
            .collect();
        Ok(Self { lambda, curve })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// `b(j)` for every rank.
    pub fn curve(&self) -> &[f64] {
        &self.curve
    }

    /// Accepted topic ids in rank order (highest probability first).
    pub fn decide_ranked(&self, probs: &[f64]) -> Result<Vec<LabelId>> {
        if probs.len() != self.curve.len() {
            return Err(LldaError::mismatch(
                "topic probability vector",
                self.curve.len(),
                probs.len(),
            ));
        }
        if let Some(index) = probs.iter().position(|p| p.is_nan()) {
            return Err(LldaError::InvalidInput(format!(
                "topic probability {} is NaN",
                index
            )));
        }

        let mut order: Vec<usize> = (0..probs.len()).collect();
        // stable: equal probabilities keep ascending topic order
        order.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

        Ok(order
            .into_iter()
            .zip(&self.curve)
            .filter(|&(topic, &threshold)| probs[topic] > threshold)
            .map(|(topic, _)| topic)
            .collect())
    }

    /// Accepted topic ids as a set.
    pub fn decide(&self, probs: &[f64]) -> Result<LabelSet> {
        self.decide_ranked(probs).map(LabelSet::new)
    }
}

/// Discrete truncated exponential (Boltzmann) PMF over `0..n_states`.
pub fn boltzmann_pmf(rank: usize, lambda: f64, n_states: usize) -> f64 {
    if rank >= n_states {
        return 0.0;
    }
    let head = -(-lambda).exp_m1();
    let tail = -(-lambda * n_states as f64).exp_m1();
    head * (-lambda * rank as f64).exp() / tail
}

/// Decide one probability vector.
pub fn decide(probs: &[f64], lambda: f64) -> Result<LabelSet> {
    BoltzmannThreshold::new(lambda, probs.len())?.decide(probs)
}

/// Decide every row of a `documents × K` matrix, in rank order per row.
pub fn decide_all(rows: &[Vec<f64>], lambda: f64, n_states: usize) -> Result<Vec<Vec<LabelId>>> {
    let threshold = BoltzmannThreshold::new(lambda, n_states)?;
    rows.iter().map(|row| threshold.decide_ranked(row)).collect()
}
