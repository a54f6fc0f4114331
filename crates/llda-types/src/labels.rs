//! Per-document label sets and multi-label binarization.

use serde::{Deserialize, Serialize};

use crate::error::{LldaError, Result};

/// 0-based label (and topic) index.
pub type LabelId = usize;

/// Sorted, de-duplicated set of label ids attached to one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Vec<LabelId>,
}

impl LabelSet {
    pub fn new(labels: impl IntoIterator<Item = LabelId>) -> Self {
        let mut labels: Vec<LabelId> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        Self { labels }
    }

    pub fn contains(&self, label: LabelId) -> bool {
        self.labels.binary_search(&label).is_ok()
    }

    pub fn as_slice(&self) -> &[LabelId] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.labels.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Largest label id, if any.
    pub fn max(&self) -> Option<LabelId> {
        self.labels.last().copied()
    }

    /// Boolean topic mask of width `class_num`.
    ///
    /// Labels at or beyond `class_num` are ignored; callers validate first.
    pub fn mask(&self, class_num: usize) -> Vec<bool> {
        let mut mask = vec![false; class_num];
        for label in self.iter().filter(|&l| l < class_num) {
            mask[label] = true;
        }
        mask
    }

    /// Dense 0/1 indicator row of width `class_num`.
    pub fn to_indicator(&self, class_num: usize) -> Vec<u8> {
        self.mask(class_num).into_iter().map(u8::from).collect()
    }
}

impl FromIterator<LabelId> for LabelSet {
    fn from_iter<I: IntoIterator<Item = LabelId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Label sets for a whole corpus, together with the label-space width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSets {
    pub sets: Vec<LabelSet>,
    pub class_num: usize,
}

impl LabelSets {
    /// Wrap pre-built sets, checking every label lies in `[0, class_num)`.
    pub fn new(sets: Vec<LabelSet>, class_num: usize) -> Result<Self> {
        for (document, set) in sets.iter().enumerate() {
            if let Some(max) = set.max() {
                if max >= class_num {
                    return Err(LldaError::InvalidInput(format!(
                        "document {} carries label {} but class_num is {}",
                        document, max, class_num
                    )));
                }
            }
        }
        Ok(Self { sets, class_num })
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Convert a binary label matrix into per-document label sets.
///
/// `class_num` defaults to the matrix width (fit time); at predict time the
/// width recorded during fit is passed in and every row must match it.
pub fn encode_labels(y: &[Vec<u8>], class_num: Option<usize>) -> Result<LabelSets> {
    let width = class_num.unwrap_or_else(|| y.first().map_or(0, Vec::len));
    let mut sets = Vec::with_capacity(y.len());
    for (document, row) in y.iter().enumerate() {
        if row.len() != width {
            return Err(LldaError::mismatch(
                format!("label row {}", document),
                width,
                row.len(),
            ));
        }
        let mut labels = Vec::new();
        for (label, &value) in row.iter().enumerate() {
            match value {
                0 => {}
                1 => labels.push(label),
                other => {
                    return Err(LldaError::InvalidInput(format!(
                        "label matrix must be binary, found {} at ({}, {})",
                        other, document, label
                    )))
                }
            }
        }
        sets.push(LabelSet { labels });
    }
    Ok(LabelSets {
        sets,
        class_num: width,
    })
}

/// Multi-label binarization: one 0/1 row of width `class_num` per set.
pub fn binarize(sets: &[LabelSet], class_num: usize) -> Vec<Vec<u8>> {
    sets.iter().map(|s| s.to_indicator(class_num)).collect()
}
