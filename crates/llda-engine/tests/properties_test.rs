//! Property checks for the L-LDA engine over randomly generated corpora.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use llda_engine::{BoltzmannThreshold, ParticleFilter, ParticlePopulation, Trainer};
use llda_types::{
    encode_corpus, Corpus, CorpusInput, InferenceConfig, LabelSet, LabelSets, LldaError,
    TrainingConfig,
};

/// Random dense corpus with non-empty random label sets.
fn random_problem(seed: u64, docs: usize, terms: usize, topics: usize) -> (Corpus, LabelSets) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dense: Vec<Vec<u32>> = (0..docs)
        .map(|_| (0..terms).map(|_| rng.random_range(0..4)).collect())
        .collect();
    let corpus = encode_corpus(&CorpusInput::Dense(dense)).unwrap();
    let sets = (0..docs)
        .map(|_| {
            let first = rng.random_range(0..topics);
            let extra: Vec<usize> = (0..topics).filter(|_| rng.random_bool(0.3)).collect();
            LabelSet::new(std::iter::once(first).chain(extra))
        })
        .collect();
    (corpus, LabelSets::new(sets, topics).unwrap())
}

fn training(seed: u64) -> TrainingConfig {
    TrainingConfig {
        max_iter: 15,
        alpha: 0.1,
        beta: 0.05,
        seed,
    }
}

#[test]
fn test_dense_encoding_round_trips() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..200 {
        let docs = rng.random_range(0..8);
        let terms = rng.random_range(0..10);
        let dense: Vec<Vec<u32>> = (0..docs)
            .map(|_| {
                (0..terms)
                    .map(|_| if rng.random_bool(0.4) { rng.random_range(1..6) } else { 0 })
                    .collect()
            })
            .collect();

        let corpus = encode_corpus(&CorpusInput::Dense(dense.clone())).unwrap();
        assert_eq!(corpus.len(), docs);
        for (doc, row) in corpus.documents().iter().zip(&dense) {
            assert!(doc.entries().iter().all(|&(term, count)| row[term] == count && count > 0));
            assert_eq!(doc.token_count(), row.iter().sum::<u32>() as usize);
        }
        assert_eq!(corpus.to_dense(), dense);

        let again = encode_corpus(&CorpusInput::Dense(corpus.to_dense())).unwrap();
        assert_eq!(again.documents(), corpus.documents());
    }
}

#[test]
fn test_theta_zero_outside_label_set() {
    for seed in 0..5 {
        let (corpus, labels) = random_problem(seed, 12, 9, 4);
        let model = Trainer::new(training(seed)).train(&corpus, &labels).unwrap();
        for (doc, set) in labels.sets.iter().enumerate() {
            for topic in 0..labels.class_num {
                if !set.contains(topic) {
                    assert_eq!(model.theta()[doc][topic], 0.0);
                    assert_eq!(model.n_mz()[doc][topic], 0);
                }
            }
        }
    }
}

#[test]
fn test_phi_and_theta_rows_sum_to_one() {
    for seed in 0..5 {
        let (corpus, labels) = random_problem(seed + 100, 10, 15, 3);
        let model = Trainer::new(training(seed)).train(&corpus, &labels).unwrap();
        for row in model.phi().iter().chain(model.theta()) {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row sums to {sum}");
        }
    }
}

#[test]
fn test_inference_rows_sum_to_one() {
    let (corpus, labels) = random_problem(7, 10, 8, 3);
    let model = Trainer::new(training(7)).train(&corpus, &labels).unwrap();
    let (held_out, _) = random_problem(8, 5, 8, 3);
    let inference = ParticleFilter::new(InferenceConfig {
        n_particles: 40,
        ess_threshold: 20,
        rejuvenation_period: 5,
        ..InferenceConfig::default()
    })
    .infer(&model, &held_out)
    .unwrap();
    assert_eq!(inference.probabilities.len(), 5);
    for row in &inference.probabilities {
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_ess_trigger_matches_definition() {
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..200 {
        let n = rng.random_range(2..12);
        let weights: Vec<f64> = (0..n).map(|_| rng.random::<f64>() + 1e-3).collect();
        let population = ParticlePopulation::with_weights(weights, 2);
        let ess = 1.0 / population.weights().iter().map(|w| w * w).sum::<f64>();
        for threshold in 1..=n {
            assert_eq!(population.needs_resample(threshold), ess < threshold as f64);
        }
    }
}

#[test]
fn test_label_decision_monotone_under_order_preserving_domination() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..200 {
        let k = rng.random_range(2..8);
        let lambda = rng.random_range(0.05..3.0);
        let threshold = BoltzmannThreshold::new(lambda, k).unwrap();

        let mut base: Vec<f64> = (0..k).map(|_| rng.random::<f64>() / k as f64).collect();
        base.sort_by(|a, b| b.total_cmp(a));
        // a uniform boost keeps the ranking, so rank thresholds stay aligned
        let boost = rng.random::<f64>() * 0.2;
        let dominating: Vec<f64> = base.iter().map(|p| p + boost).collect();

        let small = threshold.decide(&base).unwrap();
        let large = threshold.decide(&dominating).unwrap();
        assert!(small.iter().all(|label| large.contains(label)));
    }
}

#[test]
fn test_empty_label_set_fails_before_training() {
    let (corpus, mut labels) = random_problem(3, 6, 5, 3);
    labels.sets[4] = LabelSet::default();
    let err = Trainer::new(training(3)).train(&corpus, &labels).unwrap_err();
    assert!(matches!(err, LldaError::EmptyLabelSet { document: 4 }));
}
