mod loss_fn;
mod pairwise;
mod softmax;

use ndarray::{ArrayView1, ArrayViewMut1};

pub use loss_fn::{ListLoss, LossFn};
pub use pairwise::{PairwiseHinge, PairwiseLogistic};
pub use softmax::SoftmaxLoss;

/// The loss formula used for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    PairwiseLogistic,
    PairwiseHinge,
    Softmax,
}

impl ListLoss for LossKind {
    fn list_loss(&self, scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<f32> {
        match self {
            LossKind::PairwiseLogistic => PairwiseLogistic.list_loss(scores, labels),
            LossKind::PairwiseHinge => PairwiseHinge.list_loss(scores, labels),
            LossKind::Softmax => SoftmaxLoss.list_loss(scores, labels),
        }
    }

    fn list_grad(
        &self,
        scores: ArrayView1<f32>,
        labels: ArrayView1<f32>,
        grad: ArrayViewMut1<f32>,
    ) -> bool {
        match self {
            LossKind::PairwiseLogistic => PairwiseLogistic.list_grad(scores, labels, grad),
            LossKind::PairwiseHinge => PairwiseHinge.list_grad(scores, labels, grad),
            LossKind::Softmax => SoftmaxLoss.list_grad(scores, labels, grad),
        }
    }
}
