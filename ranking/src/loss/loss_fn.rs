use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use rayon::prelude::*;

use crate::{RankErr, Result};

/// A ranking loss over a batch of `(batch_size, list_size)` scores and labels.
pub trait LossFn {
    /// Computes the batch loss along with the amount of lists it is averaged over.
    fn loss_with_count(
        &self,
        scores: ArrayView2<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<(f32, usize)>;

    /// Computes the batch loss.
    fn loss(&self, scores: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<f32> {
        Ok(self.loss_with_count(scores, labels)?.0)
    }

    /// Computes the derivative of the batch loss with respect to every score. Slots with an
    /// invalid label always get a zero derivative.
    fn loss_prime(&self, scores: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// A loss defined list by list. The batch loss is the mean over the lists that contribute.
pub trait ListLoss: Sync {
    /// Returns the loss of a single list, `None` if the list has nothing to compare.
    fn list_loss(&self, scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<f32>;

    /// Adds the derivative of `list_loss` with respect to `scores` into `grad`.
    ///
    /// # Returns
    /// Whether the list contributes to the batch loss.
    fn list_grad(
        &self,
        scores: ArrayView1<f32>,
        labels: ArrayView1<f32>,
        grad: ArrayViewMut1<f32>,
    ) -> bool;
}

impl<T: ListLoss> LossFn for T {
    fn loss_with_count(
        &self,
        scores: ArrayView2<f32>,
        labels: ArrayView2<f32>,
    ) -> Result<(f32, usize)> {
        check_shapes(scores, labels)?;

        let (sum, used) = scores
            .outer_iter()
            .into_par_iter()
            .zip(labels.outer_iter().into_par_iter())
            .filter_map(|(s, l)| self.list_loss(s, l))
            .map(|loss| (loss, 1usize))
            .reduce(|| (0., 0), |a, b| (a.0 + b.0, a.1 + b.1));

        Ok((if used == 0 { 0. } else { sum / used as f32 }, used))
    }

    fn loss_prime(&self, scores: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_shapes(scores, labels)?;

        let mut grad = Array2::zeros(scores.raw_dim());
        let used: usize = grad
            .outer_iter_mut()
            .into_par_iter()
            .zip(scores.outer_iter().into_par_iter())
            .zip(labels.outer_iter().into_par_iter())
            .map(|((g, s), l)| self.list_grad(s, l, g) as usize)
            .sum();

        if used > 0 {
            let scale = used as f32;
            grad.mapv_inplace(|g| g / scale);
        }

        Ok(grad)
    }
}

fn check_shapes(scores: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<()> {
    if scores.dim() != labels.dim() {
        return Err(RankErr::SizeMismatch {
            what: "scores and labels",
            got: scores.len(),
            expected: labels.len(),
        });
    }

    Ok(())
}
