//! Categorical sampling over unnormalized weights.

use rand::Rng;

/// Draw an index with probability proportional to `weights[i]`.
///
/// Weights must be non-negative with a positive sum. Floating-point slack at
/// the top of the cumulative sum falls back to the last index.
pub(crate) fn sample_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    debug_assert!(!weights.is_empty());
    let total: f64 = weights.iter().sum();
    let mut target = rng.random::<f64>() * total;
    for (index, &weight) in weights.iter().enumerate() {
        if target < weight {
            return index;
        }
        target -= weight;
    }
    weights.len() - 1
}

/// Derive a per-stream seed so parallel work is independent of scheduling.
pub(crate) fn stream_seed(seed: u64, stream: usize) -> u64 {
    seed ^ (stream as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
