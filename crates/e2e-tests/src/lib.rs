//! End-to-end test infrastructure for labeled-lda.
//!
//! Provides a shared TestHarness and corpus builders for tests covering the
//! full encode, fit, persist, infer and decide pipeline.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use llda_engine::{LabeledLda, LldaParams, ModelStore};
use llda_types::{format, Corpus, CorpusInput, Document, LabelSet, LabelSets};

/// Shared test harness for E2E tests.
///
/// Owns a temp directory holding the model store and any input files.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Directory for model artifacts
    pub model_dir: PathBuf,
    /// Directory for corpus and label files
    pub data_dir: PathBuf,
}

impl TestHarness {
    /// Create a new test harness with temp directory layout.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let model_dir = temp_dir.path().join("model");
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        Self {
            _temp_dir: temp_dir,
            model_dir,
            data_dir,
        }
    }

    /// Model store under the harness directory with the default prefix.
    pub fn store(&self) -> ModelStore {
        ModelStore::new(&self.model_dir, "fit")
    }

    /// Classifier with small test parameters, mirrored to the harness store.
    pub fn classifier(&self, params: LldaParams) -> LabeledLda {
        LabeledLda::new(params)
            .expect("Invalid test parameters")
            .with_store(self.store())
    }

    /// Write a corpus file and return its path.
    pub fn write_corpus(&self, name: &str, corpus: &Corpus) -> PathBuf {
        let path = self.data_dir.join(name);
        let file = File::create(&path).expect("Failed to create corpus file");
        format::write_corpus(BufWriter::new(file), corpus).expect("Failed to write corpus");
        path
    }

    /// Write a label file and return its path.
    pub fn write_labels(&self, name: &str, labels: &LabelSets) -> PathBuf {
        let path = self.data_dir.join(name);
        let file = File::create(&path).expect("Failed to create label file");
        format::write_labels(BufWriter::new(file), &labels.sets).expect("Failed to write labels");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters small enough for fast, deterministic tests.
pub fn test_params(max_iter: usize) -> LldaParams {
    let mut params = LldaParams::default();
    params.training.max_iter = max_iter;
    params.training.alpha = 0.1;
    params.training.beta = 0.1;
    params.inference.n_particles = 50;
    params.inference.ess_threshold = 10;
    params.inference.rejuvenation_period = 5;
    params
}

/// Three documents, four terms, two labels.
///
/// Term 0 and 1 belong to label 0, term 2 and 3 to label 1.
pub fn scenario_input() -> (CorpusInput, Vec<Vec<u8>>) {
    let x = CorpusInput::Dense(vec![
        vec![2, 1, 0, 0],
        vec![0, 0, 1, 3],
        vec![1, 0, 1, 0],
    ]);
    let y = vec![vec![1, 0], vec![0, 1], vec![1, 1]];
    (x, y)
}

/// Synthetic corpus where each label owns a disjoint block of terms.
///
/// Every document carries one or two labels and draws its tokens only from
/// the blocks of its labels.
pub fn block_corpus(
    n_docs: usize,
    class_num: usize,
    terms_per_label: usize,
    tokens_per_doc: usize,
    seed: u64,
) -> (Corpus, LabelSets) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut documents = Vec::with_capacity(n_docs);
    let mut sets = Vec::with_capacity(n_docs);

    for _ in 0..n_docs {
        let first = rng.random_range(0..class_num);
        let mut labels = vec![first];
        if class_num > 1 && rng.random_bool(0.3) {
            labels.push((first + 1) % class_num);
        }

        let mut counts = vec![0u32; class_num * terms_per_label];
        for _ in 0..tokens_per_doc {
            let label = labels[rng.random_range(0..labels.len())];
            let term = label * terms_per_label + rng.random_range(0..terms_per_label);
            counts[term] += 1;
        }
        let entries = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(term, &c)| (term, c))
            .collect();
        documents.push(Document::new(entries).expect("Generated duplicate term"));
        sets.push(LabelSet::new(labels));
    }

    let corpus = Corpus::with_vocab_size(documents, class_num * terms_per_label)
        .expect("Generated term outside vocabulary");
    let labels = LabelSets::new(sets, class_num).expect("Generated label outside range");
    (corpus, labels)
}

/// Single document drawing `tokens` tokens from one label's term block.
pub fn block_document(label: usize, terms_per_label: usize, tokens: u32) -> Document {
    let entries = (0..terms_per_label)
        .map(|t| (label * terms_per_label + t, tokens.div_ceil(terms_per_label as u32)))
        .collect();
    Document::new(entries).expect("Generated duplicate term")
}
