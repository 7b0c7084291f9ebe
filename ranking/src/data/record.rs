/// The label given to padding slots. It is strictly less than any valid relevance grade.
pub const PADDING_LABEL: f32 = -1.0;

/// The highest relevance grade accepted from input. Gains are `2^label - 1`, this keeps them
/// well inside `f64` range.
pub const MAX_LABEL: f32 = 31.0;

/// Returns whether `label` is a relevance grade that takes part in losses and metrics.
///
/// Padding slots and unlabeled documents both carry negative labels and are excluded.
#[inline]
pub fn is_valid_label(label: f32) -> bool {
    label >= 0.0
}

/// A single (query, document) line of input.
///
/// Features are kept sparse as they were read, `(index, value)` with 1-based indices. They are
/// densified into the fixed schema when the record is placed in a `List`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    qid: u64,
    label: f32,
    features: Vec<(usize, f32)>,
}

impl Record {
    /// Creates a new `Record`.
    ///
    /// # Arguments
    /// * `qid` - The query this document belongs to.
    /// * `label` - The relevance grade, a negative value marks the document as unlabeled.
    /// * `features` - Sparse `(index, value)` pairs, indices start at 1.
    ///
    /// # Returns
    /// A new `Record` instance.
    pub fn new(qid: u64, label: f32, features: Vec<(usize, f32)>) -> Self {
        Self {
            qid,
            label,
            features,
        }
    }

    #[inline]
    pub fn qid(&self) -> u64 {
        self.qid
    }

    #[inline]
    pub fn label(&self) -> f32 {
        self.label
    }

    #[inline]
    pub fn is_labeled(&self) -> bool {
        is_valid_label(self.label)
    }

    #[inline]
    pub fn features(&self) -> &[(usize, f32)] {
        &self.features
    }
}

/// All the records sharing a query id, in the order they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub qid: u64,
    pub records: Vec<Record>,
}

impl Query {
    pub fn new(qid: u64, records: Vec<Record>) -> Self {
        Self { qid, records }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
