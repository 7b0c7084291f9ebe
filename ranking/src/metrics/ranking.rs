use ndarray::ArrayView1;

use crate::data::is_valid_label;

/// Orders the valid slots of a list by descending score.
///
/// Slots with equal scores keep their original slot order, so an untrained model that scores
/// every document the same is evaluated in input order.
///
/// # Returns
/// The slot indices, best first.
pub fn rank_slots(scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Vec<usize> {
    let mut slots: Vec<usize> = (0..labels.len())
        .filter(|&i| is_valid_label(labels[i]))
        .collect();

    // sort_by is stable
    slots.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    slots
}

#[inline]
fn gain(label: f32) -> f64 {
    (label as f64).exp2() - 1.
}

#[inline]
fn discount(rank: usize) -> f64 {
    1. / ((rank + 1) as f64).log2()
}

/// Discounted cumulative gain of `labels` taken in the given order, cut at `k`.
///
/// # Formula
///
/// ```text
/// DCG@k = Σ_{rank=1}^{min(k, n)} (2^label - 1) / log2(rank + 1)
/// ```
///
/// Accumulated in `f64`, so any grade up to `MAX_LABEL` and far beyond has a finite gain.
pub fn dcg<I>(labels: I, k: usize) -> f64
where
    I: IntoIterator<Item = f32>,
{
    labels
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(i, l)| gain(l) * discount(i + 1))
        .sum()
}

/// The labels of the valid slots sorted best first, the order `IDCG` is computed on.
fn ideal_labels(labels: ArrayView1<f32>) -> Vec<f32> {
    let mut ideal: Vec<f32> = labels.iter().copied().filter(|&l| is_valid_label(l)).collect();
    ideal.sort_by(|a, b| b.total_cmp(a));
    ideal
}

/// Normalized discounted cumulative gain at cutoff `k` for one list.
///
/// # Returns
/// `DCG@k / IDCG@k`, or `None` when the list has no valid document with positive gain and the
/// metric is undefined. Grades so large that `IDCG@k` overflows are also undefined.
pub fn ndcg_at_k(scores: ArrayView1<f32>, labels: ArrayView1<f32>, k: usize) -> Option<f32> {
    ndcg_at_cutoffs(scores, labels, &[k])[0]
}

/// Same as `ndcg_at_k` for several cutoffs at once, sharing one ranking of the list.
///
/// # Returns
/// One value per cutoff, in the order given.
pub fn ndcg_at_cutoffs(
    scores: ArrayView1<f32>,
    labels: ArrayView1<f32>,
    cutoffs: &[usize],
) -> Vec<Option<f32>> {
    let ranked: Vec<f32> = rank_slots(scores, labels)
        .into_iter()
        .map(|i| labels[i])
        .collect();
    let ideal = ideal_labels(labels);

    cutoffs
        .iter()
        .map(|&k| {
            let idcg = dcg(ideal.iter().copied(), k);
            (idcg > 0. && idcg.is_finite())
                .then(|| (dcg(ranked.iter().copied(), k) / idcg) as f32)
        })
        .collect()
}

/// Reciprocal rank of the first relevant (label > 0) document.
///
/// # Returns
/// `1 / rank`, or `None` if the list has no relevant document.
pub fn mrr(scores: ArrayView1<f32>, labels: ArrayView1<f32>) -> Option<f32> {
    rank_slots(scores, labels)
        .into_iter()
        .position(|i| labels[i] > 0.)
        .map(|pos| 1. / (pos + 1) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PADDING_LABEL;
    use ndarray::{Array1, array};

    const P: f32 = PADDING_LABEL;

    fn ndcg(scores: &[f32], labels: &[f32], k: usize) -> Option<f32> {
        let scores = Array1::from(scores.to_vec());
        let labels = Array1::from(labels.to_vec());
        ndcg_at_k(scores.view(), labels.view(), k)
    }

    #[test]
    fn ndcg_of_a_known_list() {
        let dcg = 0. + 7. / 3f32.log2() + 3. / 2. + 7. / 5f32.log2();
        let idcg = 7. + 7. / 3f32.log2() + 3. / 2. + 0.;

        let got = ndcg(&[1., 2., 3., 4.], &[3., 2., 3., 0.], 4).unwrap();
        assert!((got - dcg / idcg).abs() < 1e-6, "{got} vs {}", dcg / idcg);
    }

    #[test]
    fn perfect_scorer_is_one_at_every_cutoff() {
        let labels = [2., 0., 3., 1., 1.];
        let scores = [3., 0., 4., 2., 1.];

        for k in 1..=5 {
            let got = ndcg(&scores, &labels, k).unwrap();
            assert!((got - 1.).abs() < 1e-6, "k = {k}: {got}");
        }
    }

    #[test]
    fn worst_scorer_is_below_the_average_ordering() {
        let labels = [2., 1., 0.];
        let worst = ndcg(&[0., 1., 2.], &labels, 3).unwrap();

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let mean = orders
            .iter()
            .map(|order| {
                let scores = order.map(|r| (3 - r) as f32);
                ndcg(&scores, &labels, 3).unwrap()
            })
            .sum::<f32>()
            / orders.len() as f32;

        assert!(worst < mean, "{worst} vs {mean}");
        assert!(orders.iter().all(|order| {
            let scores = order.map(|r| (3 - r) as f32);
            ndcg(&scores, &labels, 3).unwrap() >= worst - 1e-6
        }));
    }

    #[test]
    fn padding_does_not_change_ndcg() {
        let base = ndcg(&[0.3, 0.1, 0.7], &[1., 2., 0.], 3).unwrap();
        let padded = ndcg(&[0.3, 0.1, 0.7, 99., -5.], &[1., 2., 0., P, P], 3).unwrap();
        assert_eq!(base, padded);
    }

    #[test]
    fn undefined_without_relevant_documents() {
        assert_eq!(ndcg(&[1., 2.], &[0., 0.], 2), None);
        assert_eq!(ndcg(&[0., 0., 0.], &[P, P, P], 2), None);
        assert_eq!(ndcg(&[], &[], 1), None);
    }

    #[test]
    fn large_grades_do_not_overflow() {
        assert_eq!(ndcg(&[1., 0.], &[200., 0.], 2), Some(1.));

        let swapped = ndcg(&[0., 1.], &[200., 0.], 2).unwrap();
        assert!((swapped - 1. / 3f32.log2()).abs() < 1e-6, "{swapped}");

        assert_eq!(ndcg(&[1., 0.], &[2000., 0.], 2), None);
    }

    #[test]
    fn ties_keep_slot_order() {
        let labels = array![0., 1., 2.];
        let scores = Array1::zeros(3);

        assert_eq!(rank_slots(scores.view(), labels.view()), [0, 1, 2]);

        let got = ndcg_at_k(scores.view(), labels.view(), 3).unwrap();
        let expected = dcg([0., 1., 2.], 3) / dcg([2., 1., 0.], 3);
        assert!((got as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn cutoffs_share_one_ranking() {
        let scores = array![0.9, 0.8, 0.1, 0.5];
        let labels = array![0., 3., 1., P];

        let all = ndcg_at_cutoffs(scores.view(), labels.view(), &[1, 2, 10]);
        assert_eq!(all[0], Some(0.));
        for (k, got) in [1, 2, 10].into_iter().zip(&all) {
            assert_eq!(*got, ndcg_at_k(scores.view(), labels.view(), k));
        }
        // k beyond the valid documents behaves like k = num_valid
        assert_eq!(all[2], ndcg_at_k(scores.view(), labels.view(), 3));
    }

    #[test]
    fn reciprocal_rank_of_first_relevant() {
        let scores = array![0.9, 0.8, 0.7, 0.95];
        let labels = array![0., 1., 2., P];

        assert_eq!(mrr(scores.view(), labels.view()), Some(0.5));
        assert_eq!(mrr(scores.view(), array![0., 0., 0., P].view()), None);
    }
}
