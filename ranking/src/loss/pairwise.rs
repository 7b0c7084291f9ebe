use ndarray::{ArrayView1, ArrayViewMut1};

use super::ListLoss;
use crate::{arch::stable_sigmoid, data::is_valid_label};

/// The `(higher, lower)` slot pairs of a list: both labels valid and strictly ordered.
fn ordered_pairs(labels: ArrayView1<f32>) -> Vec<(usize, usize)> {
    let valid: Vec<usize> = (0..labels.len())
        .filter(|&i| is_valid_label(labels[i]))
        .collect();

    let mut pairs = Vec::new();
    for (a, &i) in valid.iter().enumerate() {
        for &j in &valid[a + 1..] {
            if labels[i] > labels[j] {
                pairs.push((i, j));
            } else if labels[j] > labels[i] {
                pairs.push((j, i));
            }
        }
    }

    pairs
}

/// The penalty of a pair as a function of `s_higher - s_lower`.
trait PairTerm: Sync {
    fn value(&self, diff: f32) -> f32;
    fn derivative(&self, diff: f32) -> f32;
}

fn pairwise_loss<T: PairTerm>(
    term: &T,
    scores: ArrayView1<f32>,
    labels: ArrayView1<f32>,
) -> Option<f32> {
    let pairs = ordered_pairs(labels);
    if pairs.is_empty() {
        return None;
    }

    let sum: f32 = pairs
        .iter()
        .map(|&(hi, lo)| term.value(scores[hi] - scores[lo]))
        .sum();

    Some(sum / pairs.len() as f32)
}

fn pairwise_grad<T: PairTerm>(
    term: &T,
    scores: ArrayView1<f32>,
    labels: ArrayView1<f32>,
    mut grad: ArrayViewMut1<f32>,
) -> bool {
    let pairs = ordered_pairs(labels);
    if pairs.is_empty() {
        return false;
    }

    let n = pairs.len() as f32;
    for (hi, lo) in pairs {
        let d = term.derivative(scores[hi] - scores[lo]) / n;
        grad[hi] += d;
        grad[lo] -= d;
    }

    true
}

/// RankNet style logistic loss, `log(1 + e^-(s_i - s_j))` for every pair with `label_i > label_j`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PairwiseLogistic;

impl PairTerm for PairwiseLogistic {
    fn value(&self, diff: f32) -> f32 {
        // softplus(-diff)
        let x = -diff;
        x.max(0.) + (-x.abs()).exp().ln_1p()
    }

    fn derivative(&self, diff: f32) -> f32 {
        -stable_sigmoid(-diff)
    }
}

impl ListLoss for PairwiseLogistic {
    fn list_loss(&self, scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<f32> {
        pairwise_loss(self, scores, labels)
    }

    fn list_grad(
        &self,
        scores: ArrayView1<f32>,
        labels: ArrayView1<f32>,
        grad: ArrayViewMut1<f32>,
    ) -> bool {
        pairwise_grad(self, scores, labels, grad)
    }
}

/// Margin loss, `max(0, 1 - (s_i - s_j))` for every pair with `label_i > label_j`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PairwiseHinge;

impl PairTerm for PairwiseHinge {
    fn value(&self, diff: f32) -> f32 {
        (1. - diff).max(0.)
    }

    fn derivative(&self, diff: f32) -> f32 {
        if diff < 1. { -1. } else { 0. }
    }
}

impl ListLoss for PairwiseHinge {
    fn list_loss(&self, scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<f32> {
        pairwise_loss(self, scores, labels)
    }

    fn list_grad(
        &self,
        scores: ArrayView1<f32>,
        labels: ArrayView1<f32>,
        grad: ArrayViewMut1<f32>,
    ) -> bool {
        pairwise_grad(self, scores, labels, grad)
    }
}
