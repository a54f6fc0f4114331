//! Particle population storage for sequential Monte Carlo inference.
//!
//! A population is a fixed-capacity arena of particle records plus a
//! parallel weight array. Resampling copies survivors into a second arena
//! with `clone_from` (reusing allocations) and swaps the two.

use rand::Rng;

/// One hypothesis of a document's topic assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Particle {
    /// Tokens per topic seen so far.
    counts: Vec<u32>,
    /// Topic of each observed token, in observation order.
    topics: Vec<usize>,
}

impl Particle {
    fn new(n_topics: usize) -> Self {
        Self {
            counts: vec![0; n_topics],
            topics: Vec::new(),
        }
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn topics(&self) -> &[usize] {
        &self.topics
    }

    /// Number of tokens assigned so far.
    pub fn observed(&self) -> usize {
        self.topics.len()
    }

    pub(crate) fn push(&mut self, topic: usize) {
        self.counts[topic] += 1;
        self.topics.push(topic);
    }

    /// Remove the token at `position` from the counts, returning its topic.
    /// Must be followed by [`Particle::restore`].
    pub(crate) fn withdraw(&mut self, position: usize) -> usize {
        let topic = self.topics[position];
        self.counts[topic] -= 1;
        topic
    }

    pub(crate) fn restore(&mut self, position: usize, topic: usize) {
        self.counts[topic] += 1;
        self.topics[position] = topic;
    }

    /// Smoothed topic mixture `(n_k + α) / (n + K·α)`.
    pub fn mixture(&self, alpha: f64) -> Vec<f64> {
        let k = self.counts.len() as f64;
        let denom = self.observed() as f64 + k * alpha;
        self.counts
            .iter()
            .map(|&c| (f64::from(c) + alpha) / denom)
            .collect()
    }
}

/// `1 / Σ w²` for normalized weights.
pub fn effective_sample_size(weights: &[f64]) -> f64 {
    let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
    if sum_sq > 0.0 {
        1.0 / sum_sq
    } else {
        0.0
    }
}

/// Systematic resampling: ancestor slot for each of `weights.len()` draws.
///
/// `offset` is the single uniform draw in `[0, 1)`.
pub fn systematic_resample(weights: &[f64], offset: f64, ancestors: &mut Vec<usize>) {
    let n = weights.len();
    ancestors.clear();
    let step = 1.0 / n as f64;
    let mut cumulative = 0.0;
    let mut slot = 0;
    for i in 0..n {
        let target = (offset + i as f64) * step;
        while slot + 1 < n && cumulative + weights[slot] <= target {
            cumulative += weights[slot];
            slot += 1;
        }
        ancestors.push(slot);
    }
}

/// Weighted particles for one document.
#[derive(Debug, Clone)]
pub struct ParticlePopulation {
    particles: Vec<Particle>,
    weights: Vec<f64>,
    scratch: Vec<Particle>,
    ancestors: Vec<usize>,
}

impl ParticlePopulation {
    /// `n_particles` empty particles with uniform weight.
    pub fn new(n_particles: usize, n_topics: usize) -> Self {
        let uniform = 1.0 / n_particles as f64;
        Self {
            particles: vec![Particle::new(n_topics); n_particles],
            weights: vec![uniform; n_particles],
            scratch: vec![Particle::new(n_topics); n_particles],
            ancestors: Vec::with_capacity(n_particles),
        }
    }

    /// Population with explicit weights (normalized on entry).
    pub fn with_weights(weights: Vec<f64>, n_topics: usize) -> Self {
        let mut population = Self::new(weights.len(), n_topics);
        population.weights = weights;
        population.normalize();
        population
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Slots as `(particle, weight)` pairs for in-place updates.
    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = (&mut Particle, &mut f64)> {
        self.particles.iter_mut().zip(self.weights.iter_mut())
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Rescale weights to sum to one.
    ///
    /// Returns `false` (and resets to uniform) if every weight vanished.
    pub fn normalize(&mut self) -> bool {
        let total: f64 = self.weights.iter().sum();
        if total > 0.0 && total.is_finite() {
            for w in &mut self.weights {
                *w /= total;
            }
            true
        } else {
            self.reset_weights();
            false
        }
    }

    pub fn effective_sample_size(&self) -> f64 {
        effective_sample_size(&self.weights)
    }

    /// True iff `ESS < threshold`.
    pub fn needs_resample(&self, threshold: usize) -> bool {
        self.effective_sample_size() < threshold as f64
    }

    /// Systematic resampling followed by a uniform weight reset.
    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let offset = rng.random::<f64>();
        systematic_resample(&self.weights, offset, &mut self.ancestors);
        for (target, &ancestor) in self.scratch.iter_mut().zip(&self.ancestors) {
            target.clone_from(&self.particles[ancestor]);
        }
        std::mem::swap(&mut self.particles, &mut self.scratch);
        self.reset_weights();
    }

    /// Weighted average of every particle's smoothed topic mixture.
    pub fn topic_distribution(&self, alpha: f64) -> Vec<f64> {
        let n_topics = self.particles.first().map_or(0, |p| p.counts.len());
        let mut distribution = vec![0.0; n_topics];
        for (particle, &weight) in self.particles.iter().zip(&self.weights) {
            for (acc, p) in distribution.iter_mut().zip(particle.mixture(alpha)) {
                *acc += weight * p;
            }
        }
        distribution
    }

    fn reset_weights(&mut self) {
        let uniform = 1.0 / self.weights.len() as f64;
        self.weights.iter_mut().for_each(|w| *w = uniform);
    }
}
