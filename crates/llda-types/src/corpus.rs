//! Sparse document-term corpus.
//!
//! A [`Corpus`] is an immutable, ordered collection of [`Document`]s, each a
//! sequence of `(term-id, count)` pairs with unique, 0-based term ids.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{LldaError, Result};

/// 0-based vocabulary index.
pub type TermId = usize;

/// One bag-of-words document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    entries: Vec<(TermId, u32)>,
}

impl Document {
    /// Build a document, rejecting repeated term ids.
    pub fn new(entries: Vec<(TermId, u32)>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for (term, _) in &entries {
            if !seen.insert(*term) {
                return Err(LldaError::InvalidInput(format!(
                    "term {} appears more than once in a document",
                    term
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The `(term-id, count)` pairs in insertion order.
    pub fn entries(&self) -> &[(TermId, u32)] {
        &self.entries
    }

    /// Total number of tokens (sum of counts).
    pub fn token_count(&self) -> usize {
        self.entries.iter().map(|(_, c)| *c as usize).sum()
    }

    /// Expand counts into the token stream seen by the samplers.
    ///
    /// `{3:2, 5:1}` yields `3, 3, 5`.
    pub fn tokens(&self) -> impl Iterator<Item = TermId> + '_ {
        self.entries
            .iter()
            .flat_map(|&(term, count)| std::iter::repeat(term).take(count as usize))
    }

    /// True when the document carries no tokens.
    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }

    fn max_term(&self) -> Option<TermId> {
        self.entries.iter().map(|(t, _)| *t).max()
    }
}

/// Ordered collection of documents sharing one vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
    vocab_size: usize,
}

impl Corpus {
    /// Build a corpus whose vocabulary spans the largest term id present.
    ///
    /// Fails with `InvalidInput` when that id has no successor (`usize::MAX`).
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let vocab_size = match documents.iter().filter_map(Document::max_term).max() {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                LldaError::InvalidInput(format!("term id {} is out of range", max))
            })?,
            None => 0,
        };
        Ok(Self {
            documents,
            vocab_size,
        })
    }

    /// Build a corpus with an explicit vocabulary size.
    pub fn with_vocab_size(documents: Vec<Document>, vocab_size: usize) -> Result<Self> {
        let corpus = Self::new(documents)?;
        if corpus.vocab_size > vocab_size {
            return Err(LldaError::mismatch(
                "corpus vocabulary",
                vocab_size,
                corpus.vocab_size,
            ));
        }
        Ok(Self {
            vocab_size,
            ..corpus
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of distinct term ids the corpus may reference.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Total tokens across all documents.
    pub fn token_count(&self) -> usize {
        self.documents.iter().map(Document::token_count).sum()
    }

    /// Decode back into a dense `documents × vocab_size` count matrix.
    pub fn to_dense(&self) -> Vec<Vec<u32>> {
        self.documents
            .iter()
            .map(|doc| {
                let mut row = vec![0u32; self.vocab_size];
                for &(term, count) in doc.entries() {
                    row[term] += count;
                }
                row
            })
            .collect()
    }
}

/// Raw document collection accepted by [`encode_corpus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusInput {
    /// Rows are documents, columns are terms.
    Dense(Vec<Vec<u32>>),
    /// Already tokenized `(term-id, count)` documents.
    BagOfWords(Vec<Vec<(TermId, u32)>>),
}

/// Convert a dense matrix or bag-of-words input into a [`Corpus`].
///
/// Dense rows must all have the same width; zero-count cells are dropped.
/// Bag-of-words documents must not repeat a term id.
pub fn encode_corpus(input: &CorpusInput) -> Result<Corpus> {
    match input {
        CorpusInput::Dense(rows) => {
            let width = rows.first().map_or(0, Vec::len);
            let mut documents = Vec::with_capacity(rows.len());
            for (index, row) in rows.iter().enumerate() {
                if row.len() != width {
                    return Err(LldaError::InvalidInput(format!(
                        "dense row {} has {} columns, expected {}",
                        index,
                        row.len(),
                        width
                    )));
                }
                let entries = row
                    .iter()
                    .enumerate()
                    .filter(|&(_, &count)| count > 0)
                    .map(|(term, &count)| (term, count))
                    .collect();
                documents.push(Document { entries });
            }
            Corpus::with_vocab_size(documents, width)
        }
        CorpusInput::BagOfWords(docs) => {
            let documents = docs
                .iter()
                .enumerate()
                .map(|(index, entries)| {
                    Document::new(entries.clone()).map_err(|e| {
                        LldaError::InvalidInput(format!("bag-of-words document {}: {}", index, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Corpus::new(documents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_drops_zero_counts() {
        let corpus = encode_corpus(&CorpusInput::Dense(vec![vec![2, 0, 1], vec![0, 0, 4]]))
            .unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.vocab_size(), 3);
        assert_eq!(corpus.documents()[0].entries(), &[(0, 2), (2, 1)]);
        assert_eq!(corpus.documents()[1].entries(), &[(2, 4)]);
    }

    #[test]
    fn test_dense_round_trip() {
        let dense = vec![vec![1, 0, 3, 0], vec![0, 0, 0, 0], vec![5, 2, 0, 1]];
        let corpus = encode_corpus(&CorpusInput::Dense(dense.clone())).unwrap();
        assert_eq!(corpus.to_dense(), dense);

        let again = encode_corpus(&CorpusInput::Dense(corpus.to_dense())).unwrap();
        assert_eq!(again, corpus);
    }

    #[test]
    fn test_ragged_dense_rejected() {
        let err = encode_corpus(&CorpusInput::Dense(vec![vec![1, 2], vec![1]])).unwrap_err();
        assert!(matches!(err, LldaError::InvalidInput(_)));
    }

    #[test]
    fn test_bag_of_words_max_term_id_rejected() {
        let err =
            encode_corpus(&CorpusInput::BagOfWords(vec![vec![(usize::MAX, 1)]])).unwrap_err();
        assert!(matches!(err, LldaError::InvalidInput(_)), "{:?}", err);

        let corpus =
            encode_corpus(&CorpusInput::BagOfWords(vec![vec![(usize::MAX - 1, 1)]])).unwrap();
        assert_eq!(corpus.vocab_size(), usize::MAX);
    }

    #[test]
    fn test_bag_of_words_repeated_term_rejected() {
        let err = encode_corpus(&CorpusInput::BagOfWords(vec![vec![(1, 2), (1, 3)]])).unwrap_err();
        assert!(matches!(err, LldaError::InvalidInput(_)));
    }

    #[test]
    fn test_bag_of_words_vocab_from_max_term() {
        let corpus =
            encode_corpus(&CorpusInput::BagOfWords(vec![vec![(4, 1)], vec![(0, 2), (7, 1)]]))
                .unwrap();
        assert_eq!(corpus.vocab_size(), 8);
        assert_eq!(corpus.token_count(), 4);
    }

    #[test]
    fn test_tokens_expand_counts_in_order() {
        let doc = Document::new(vec![(3, 2), (5, 1), (9, 0)]).unwrap();
        assert_eq!(doc.tokens().collect::<Vec<_>>(), vec![3, 3, 5]);
        assert_eq!(doc.token_count(), 3);
    }

    #[test]
    fn test_with_vocab_size_too_small() {
        let doc = Document::new(vec![(5, 1)]).unwrap();
        let err = Corpus::with_vocab_size(vec![doc], 3).unwrap_err();
        assert!(matches!(err, LldaError::DimensionMismatch { .. }));
    }
}
