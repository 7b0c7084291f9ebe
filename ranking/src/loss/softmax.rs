use ndarray::{ArrayView1, ArrayViewMut1};

use super::ListLoss;
use crate::data::is_valid_label;

/// Listwise cross-entropy between the softmax of the scores and the label distribution.
///
/// Only valid slots take part in the softmax. Lists whose valid labels add up to zero have no
/// target distribution and do not contribute.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxLoss;

struct Softmax {
    valid: Vec<usize>,
    probs: Vec<f32>,
    log_probs: Vec<f32>,
    targets: Vec<f32>,
}

fn softmax(scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<Softmax> {
    let valid: Vec<usize> = (0..labels.len())
        .filter(|&i| is_valid_label(labels[i]))
        .collect();

    let mass: f32 = valid.iter().map(|&i| labels[i]).sum();
    if mass <= 0. {
        return None;
    }

    let max = valid
        .iter()
        .map(|&i| scores[i])
        .fold(f32::NEG_INFINITY, f32::max);
    let lse = max + valid.iter().map(|&i| (scores[i] - max).exp()).sum::<f32>().ln();

    let log_probs: Vec<f32> = valid.iter().map(|&i| scores[i] - lse).collect();
    let probs = log_probs.iter().map(|lp| lp.exp()).collect();
    let targets = valid.iter().map(|&i| labels[i] / mass).collect();

    Some(Softmax {
        valid,
        probs,
        log_probs,
        targets,
    })
}

impl ListLoss for SoftmaxLoss {
    fn list_loss(&self, scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<f32> {
        let sm = softmax(scores, labels)?;
        let loss = sm
            .targets
            .iter()
            .zip(&sm.log_probs)
            .map(|(t, lp)| -t * lp)
            .sum();

        Some(loss)
    }

    fn list_grad(
        &self,
        scores: ArrayView1<f32>,
        labels: ArrayView1<f32>,
        mut grad: ArrayViewMut1<f32>,
    ) -> bool {
        let Some(sm) = softmax(scores, labels) else {
            return false;
        };

        for ((&i, p), t) in sm.valid.iter().zip(&sm.probs).zip(&sm.targets) {
            grad[i] += p - t;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::PADDING_LABEL, loss::LossFn};
    use ndarray::array;

    const P: f32 = PADDING_LABEL;

    #[test]
    fn uniform_scores_give_log_n() {
        let loss = SoftmaxLoss
            .loss(array![[0., 0., 0., 9.]].view(), array![[1., 0., 0., P]].view())
            .unwrap();
        assert!((loss - 3f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn zero_mass_lists_do_not_contribute() {
        let scores = array![[1., 2.], [0., 0.]];
        let labels = array![[0., 0.], [1., 0.]];

        let batch = SoftmaxLoss.loss(scores.view(), labels.view()).unwrap();
        let single = SoftmaxLoss
            .loss(array![[0., 0.]].view(), array![[1., 0.]].view())
            .unwrap();
        assert!((batch - single).abs() < 1e-6);

        let grad = SoftmaxLoss.loss_prime(scores.view(), labels.view()).unwrap();
        assert!(grad.row(0).iter().all(|&g| g == 0.));
    }

    #[test]
    fn stable_for_large_scores() {
        let scores = array![[1e4, -1e4, 5e3]];
        let labels = array![[0., 1., 2.]];

        let loss = SoftmaxLoss.loss(scores.view(), labels.view()).unwrap();
        let grad = SoftmaxLoss.loss_prime(scores.view(), labels.view()).unwrap();

        assert!(loss.is_finite());
        assert!(grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let scores = array![[0.3, -0.2, 0.9, 4.0]];
        let labels = array![[2., 0., 1., P]];
        let grad = SoftmaxLoss.loss_prime(scores.view(), labels.view()).unwrap();
        let eps = 1e-2;

        for i in 0..4 {
            let mut plus = scores.clone();
            let mut minus = scores.clone();
            plus[[0, i]] += eps;
            minus[[0, i]] -= eps;

            let lp = SoftmaxLoss.loss(plus.view(), labels.view()).unwrap();
            let lm = SoftmaxLoss.loss(minus.view(), labels.view()).unwrap();
            let numeric = (lp - lm) / (2. * eps);

            assert!((numeric - grad[[0, i]]).abs() < 1e-3, "{i}: {numeric} vs {}", grad[[0, i]]);
        }

        assert_eq!(grad[[0, 3]], 0.);
    }
}
