use std::fmt;

use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;

use super::{mrr, ndcg_at_cutoffs};
use crate::{RankErr, Result};

/// A named scalar metric, `None` when no list had it defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: Option<f32>,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}={value:.4}", self.name),
            None => write!(f, "{}=n/a", self.name),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    #[inline]
    fn push(&mut self, value: Option<f32>) {
        if let Some(value) = value {
            self.sum += value as f64;
            self.count += 1;
        }
    }

    #[inline]
    fn value(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / self.count as f64) as f32)
    }
}

/// Averages per-list metrics over every batch of an evaluation pass.
///
/// Lists where a metric is undefined are left out of that metric's mean only.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    cutoffs: Vec<usize>,
    ndcg: Vec<Mean>,
    mrr: Mean,
}

impl MetricsAccumulator {
    /// Creates a new `MetricsAccumulator` reporting `ndcg@k` for each of `cutoffs` and `mrr`.
    pub fn new(cutoffs: &[usize]) -> Self {
        Self {
            cutoffs: cutoffs.to_vec(),
            ndcg: vec![Mean::default(); cutoffs.len()],
            mrr: Mean::default(),
        }
    }

    /// Adds every list of a `(batch_size, list_size)` batch of scores and labels.
    pub fn add_batch(&mut self, scores: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<()> {
        if scores.dim() != labels.dim() {
            return Err(RankErr::SizeMismatch {
                what: "scores",
                got: scores.len(),
                expected: labels.len(),
            });
        }

        let per_list: Vec<_> = scores
            .axis_iter(Axis(0))
            .into_par_iter()
            .zip(labels.axis_iter(Axis(0)))
            .map(|(s, l)| (ndcg_at_cutoffs(s, l, &self.cutoffs), mrr(s, l)))
            .collect();

        for (ndcg, rr) in per_list {
            for (mean, value) in self.ndcg.iter_mut().zip(ndcg) {
                mean.push(value);
            }
            self.mrr.push(rr);
        }

        Ok(())
    }

    /// The amount of lists with a defined `ndcg@k` for the first cutoff.
    pub fn lists(&self) -> usize {
        self.ndcg.first().map_or(self.mrr.count, |mean| mean.count)
    }

    /// Returns `ndcg@k` for every cutoff followed by `mrr`.
    pub fn results(&self) -> Vec<Metric> {
        self.cutoffs
            .iter()
            .zip(&self.ndcg)
            .map(|(k, mean)| Metric {
                name: format!("ndcg@{k}"),
                value: mean.value(),
            })
            .chain(std::iter::once(Metric {
                name: "mrr".into(),
                value: self.mrr.value(),
            }))
            .collect()
    }
}

/// Batch `NDCG@k`: the mean over the lists where it is defined.
///
/// # Arguments
/// * `scores` - The `(batch_size, list_size)` scores.
/// * `labels` - The labels aligned by slot with `scores`.
/// * `k` - The cutoff.
///
/// # Returns
/// The mean, `None` if no list of the batch has it defined, or a `SizeMismatch` error.
pub fn batch_ndcg_at_k(
    scores: ArrayView2<f32>,
    labels: ArrayView2<f32>,
    k: usize,
) -> Result<Option<f32>> {
    let mut acc = MetricsAccumulator::new(&[k]);
    acc.add_batch(scores, labels)?;
    Ok(acc.ndcg[0].value())
}
