use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::PADDING_LABEL;

/// A fixed-size list of documents for one query.
///
/// Real documents occupy the first `num_docs()` slots, the rest are padding: all-zero features
/// and a `PADDING_LABEL` label.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    qid: Option<u64>,
    features: Array2<f32>,
    labels: Array1<f32>,
    num_docs: usize,
}

impl List {
    /// Creates a new `List` from already densified buffers.
    ///
    /// `features` must be `(list_size, num_features)` and `labels` must be `list_size` long, with
    /// the slots from `num_docs` onwards already holding padding.
    pub(crate) fn new(
        qid: Option<u64>,
        features: Array2<f32>,
        labels: Array1<f32>,
        num_docs: usize,
    ) -> Self {
        debug_assert_eq!(features.nrows(), labels.len());
        debug_assert!(num_docs <= labels.len());

        Self {
            qid,
            features,
            labels,
            num_docs,
        }
    }

    /// Returns a list made only of padding slots.
    ///
    /// # Arguments
    /// * `list_size` - The amount of slots.
    /// * `num_features` - The width of each slot's feature vector.
    pub fn padding(list_size: usize, num_features: usize) -> Self {
        Self::new(
            None,
            Array2::zeros((list_size, num_features)),
            Array1::from_elem(list_size, PADDING_LABEL),
            0,
        )
    }

    /// The query this list was assembled from, `None` for padding-only lists.
    #[inline]
    pub fn qid(&self) -> Option<u64> {
        self.qid
    }

    #[inline]
    pub fn list_size(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// The amount of slots holding a real document.
    #[inline]
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    #[inline]
    pub fn is_padding(&self, slot: usize) -> bool {
        slot >= self.num_docs
    }

    #[inline]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    #[inline]
    pub fn labels(&self) -> ArrayView1<'_, f32> {
        self.labels.view()
    }
}
