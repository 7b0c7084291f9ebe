use std::num::NonZeroUsize;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rand::{Rng, seq::SliceRandom};

use super::{List, PADDING_LABEL};
use crate::{RankErr, Result};

/// A fixed-shape group of lists, `(batch_size, list_size, num_features)` features aligned with
/// `(batch_size, list_size)` labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    features: Array3<f32>,
    labels: Array2<f32>,
    context: Array2<f32>,
}

impl Batch {
    /// Stacks `lists` into a batch of exactly `batch_size` lists, filling the missing rows with
    /// padding-only lists.
    ///
    /// # Arguments
    /// * `lists` - At most `batch_size` lists, all sharing `list_size` and `num_features`.
    /// * `batch_size` - The amount of rows of the batch.
    /// * `list_size` - The amount of slots per list.
    /// * `num_features` - The width of each slot's feature vector.
    ///
    /// # Returns
    /// The batch or a `SizeMismatch` if a list does not have the expected shape.
    pub fn from_lists(
        lists: &[List],
        batch_size: usize,
        list_size: usize,
        num_features: usize,
    ) -> Result<Self> {
        if lists.len() > batch_size {
            return Err(RankErr::SizeMismatch {
                what: "lists in batch",
                got: lists.len(),
                expected: batch_size,
            });
        }

        let mut features = Array3::zeros((batch_size, list_size, num_features));
        let mut labels = Array2::from_elem((batch_size, list_size), PADDING_LABEL);

        for (i, list) in lists.iter().enumerate() {
            check_shape(list, list_size, num_features)?;
            features.index_axis_mut(Axis(0), i).assign(&list.features());
            labels.row_mut(i).assign(&list.labels());
        }

        Ok(Self {
            features,
            labels,
            context: Array2::zeros((batch_size, 0)),
        })
    }

    /// Attaches per-list context features, `(batch_size, context_features)`.
    pub fn with_context(mut self, context: Array2<f32>) -> Result<Self> {
        if context.nrows() != self.batch_size() {
            return Err(RankErr::SizeMismatch {
                what: "context rows",
                got: context.nrows(),
                expected: self.batch_size(),
            });
        }

        self.context = context;
        Ok(self)
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.labels.nrows()
    }

    #[inline]
    pub fn list_size(&self) -> usize {
        self.labels.ncols()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.features.len_of(Axis(2))
    }

    #[inline]
    pub fn features(&self) -> ArrayView3<'_, f32> {
        self.features.view()
    }

    #[inline]
    pub fn labels(&self) -> ArrayView2<'_, f32> {
        self.labels.view()
    }

    #[inline]
    pub fn context(&self) -> ArrayView2<'_, f32> {
        self.context.view()
    }
}

fn check_shape(list: &List, list_size: usize, num_features: usize) -> Result<()> {
    if list.list_size() != list_size {
        return Err(RankErr::SizeMismatch {
            what: "list size",
            got: list.list_size(),
            expected: list_size,
        });
    }

    if list.num_features() != num_features {
        return Err(RankErr::SizeMismatch {
            what: "list features",
            got: list.num_features(),
            expected: num_features,
        });
    }

    Ok(())
}

/// Every assembled list of a split, sharing one `list_size` and `num_features`.
#[derive(Debug, Clone)]
pub struct ListDataset {
    lists: Vec<List>,
    list_size: usize,
    num_features: usize,
}

impl ListDataset {
    /// Creates a new `ListDataset`.
    ///
    /// # Returns
    /// The dataset or a `SizeMismatch` if any list disagrees on the shape.
    pub fn new(lists: Vec<List>, list_size: usize, num_features: usize) -> Result<Self> {
        for list in &lists {
            check_shape(list, list_size, num_features)?;
        }

        Ok(Self {
            lists,
            list_size,
            num_features,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    #[inline]
    pub fn list_size(&self) -> usize {
        self.list_size
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    #[inline]
    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    /// The amount of real documents across all lists.
    pub fn num_docs(&self) -> usize {
        self.lists.iter().map(List::num_docs).sum()
    }

    /// Shuffles the order of the lists, used between epochs.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.lists.shuffle(rng);
    }

    /// Returns an iterator of batches of exactly `batch_size` lists each, the last one padded.
    pub fn batches(&self, batch_size: NonZeroUsize) -> impl Iterator<Item = Result<Batch>> + '_ {
        self.lists.chunks(batch_size.get()).map(move |chunk| {
            Batch::from_lists(chunk, batch_size.get(), self.list_size, self.num_features)
        })
    }
}
