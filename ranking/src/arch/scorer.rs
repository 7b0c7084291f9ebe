use std::num::NonZeroUsize;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis, s};

use super::{ActFn, Dense, DenseTape, Sequential};
use crate::{RankErr, Result, data::Batch};

/// What the scorer remembers from a training forward pass.
#[derive(Debug, Clone)]
pub struct ScorerTape {
    tapes: Vec<DenseTape>,
    shape: (usize, usize),
}

/// Scores documents a group at a time.
///
/// The network sees the context features followed by the features of `group_size` documents and
/// emits one score per document of the group. Lists are scored by splitting them into consecutive
/// groups in slot order and concatenating the group outputs, so with `group_size = 1` this is
/// plain pointwise scoring.
///
/// Scoring is a pure function of the parameters and the input: a scorer that ignores the other
/// members of its group yields the same scores for a list whatever the group size.
#[derive(Clone, Debug)]
pub struct GroupwiseScorer {
    context_features: usize,
    num_features: usize,
    group_size: NonZeroUsize,
    net: Sequential,
}

impl GroupwiseScorer {
    /// Creates a new `GroupwiseScorer`.
    ///
    /// # Arguments
    /// * `context_features` - The width of the per-list context vector, may be 0.
    /// * `num_features` - The width of each document's feature vector.
    /// * `group_size` - The amount of documents scored together.
    /// * `hidden_layer_dims` - The output width of each hidden layer, may be empty.
    /// * `act_fn` - The activation of the hidden layers, the output layer is linear.
    ///
    /// # Returns
    /// A new `GroupwiseScorer` or an `InvalidConfig` error if any dimension is zero.
    pub fn new(
        context_features: usize,
        num_features: usize,
        group_size: usize,
        hidden_layer_dims: &[usize],
        act_fn: ActFn,
    ) -> Result<Self> {
        if num_features == 0 {
            return Err(RankErr::InvalidConfig("num_features must be greater than 0".into()));
        }

        let group_size = NonZeroUsize::new(group_size)
            .ok_or_else(|| RankErr::InvalidConfig("group_size must be greater than 0".into()))?;

        if hidden_layer_dims.contains(&0) {
            return Err(RankErr::InvalidConfig("hidden layer dims must be greater than 0".into()));
        }

        let input = context_features + group_size.get() * num_features;
        let mut dims = Vec::with_capacity(hidden_layer_dims.len() + 2);
        dims.push(input);
        dims.extend_from_slice(hidden_layer_dims);
        dims.push(group_size.get());

        let last = dims.len() - 2;
        let layers = dims.windows(2).enumerate().map(|(i, dim)| {
            let act_fn = (i < last).then_some(act_fn);
            Dense::new((dim[0], dim[1]), act_fn)
        });

        Ok(Self {
            context_features,
            num_features,
            group_size,
            net: Sequential::new(layers),
        })
    }

    /// Returns the number of scalar parameters expected in `params`.
    pub fn num_params(&self) -> usize {
        self.net.size()
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size.get()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    #[inline]
    pub fn context_features(&self) -> usize {
        self.context_features
    }

    pub fn layers(&self) -> &[Dense] {
        self.net.layers()
    }

    /// Scores a single group of documents.
    ///
    /// # Arguments
    /// * `params` - The scorer's parameters.
    /// * `context` - The context features, `context_features` long.
    /// * `group` - The `(group_size, num_features)` document features.
    ///
    /// # Returns
    /// One score per document of the group.
    pub fn score(
        &self,
        params: &[f32],
        context: ArrayView1<f32>,
        group: ArrayView2<f32>,
    ) -> Result<Array1<f32>> {
        if group.nrows() != self.group_size() {
            return Err(RankErr::SizeMismatch {
                what: "group documents",
                got: group.nrows(),
                expected: self.group_size(),
            });
        }

        self.score_list(params, context, group)
    }

    /// Scores every slot of a list, group by group in slot order.
    ///
    /// # Arguments
    /// * `params` - The scorer's parameters.
    /// * `context` - The context features, `context_features` long.
    /// * `list` - The `(list_size, num_features)` document features, `list_size` must be a
    ///   multiple of the group size.
    ///
    /// # Returns
    /// The `list_size` scores, aligned by slot with the input.
    pub fn score_list(
        &self,
        params: &[f32],
        context: ArrayView1<f32>,
        list: ArrayView2<f32>,
    ) -> Result<Array1<f32>> {
        let scores = self.score_lists(
            params,
            context.insert_axis(Axis(0)),
            list.insert_axis(Axis(0)),
        )?;

        Ok(scores.row(0).to_owned())
    }

    /// Scores a whole batch.
    ///
    /// # Returns
    /// The `(batch_size, list_size)` scores.
    pub fn score_batch(&self, params: &[f32], batch: &Batch) -> Result<Array2<f32>> {
        self.score_lists(params, batch.context(), batch.features())
    }

    /// Scores a batch keeping what `backward` needs.
    pub fn forward_cached(
        &self,
        params: &[f32],
        batch: &Batch,
    ) -> Result<(Array2<f32>, ScorerTape)> {
        let features = batch.features();
        let shape = (features.len_of(Axis(0)), features.len_of(Axis(1)));

        let inputs = self.group_inputs(batch.context(), features)?;
        let (out, tapes) = self.net.forward_cached(params, inputs.view())?;

        Ok((self.ungroup(out, shape)?, ScorerTape { tapes, shape }))
    }

    /// Back propagates the derivative of the loss with respect to the scores, adding the
    /// parameter gradient into `grad`.
    pub fn backward(
        &self,
        params: &[f32],
        grad: &mut [f32],
        tape: &ScorerTape,
        d_scores: ArrayView2<f32>,
    ) -> Result<()> {
        if d_scores.dim() != tape.shape {
            return Err(RankErr::SizeMismatch {
                what: "score gradient",
                got: d_scores.len(),
                expected: tape.shape.0 * tape.shape.1,
            });
        }

        let k = self.group_size();
        let rows = d_scores.len() / k;
        let d = d_scores
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((rows, k))
            .map_err(|_| RankErr::SizeMismatch {
                what: "score gradient",
                got: d_scores.len(),
                expected: rows * k,
            })?;

        self.net.backward(params, grad, &tape.tapes, d)
    }

    fn score_lists(
        &self,
        params: &[f32],
        context: ArrayView2<f32>,
        features: ArrayView3<f32>,
    ) -> Result<Array2<f32>> {
        let shape = (features.len_of(Axis(0)), features.len_of(Axis(1)));
        let inputs = self.group_inputs(context, features)?;
        let out = self.net.forward(params, inputs.view())?;
        self.ungroup(out, shape)
    }

    /// Lays out one network input row per group: `[context | doc_0 | ... | doc_{k-1}]`.
    fn group_inputs(
        &self,
        context: ArrayView2<f32>,
        features: ArrayView3<f32>,
    ) -> Result<Array2<f32>> {
        let (lists, list_size, num_features) = features.dim();
        let k = self.group_size();
        let c = self.context_features;

        if num_features != self.num_features {
            return Err(RankErr::SizeMismatch {
                what: "document features",
                got: num_features,
                expected: self.num_features,
            });
        }

        if context.dim() != (lists, c) {
            return Err(RankErr::SizeMismatch {
                what: "context features",
                got: context.ncols(),
                expected: c,
            });
        }

        if list_size % k != 0 {
            return Err(RankErr::SizeMismatch {
                what: "list size, not a multiple of the group size",
                got: list_size,
                expected: list_size.div_ceil(k) * k,
            });
        }

        let groups = list_size / k;
        let mut inputs = Array2::zeros((lists * groups, c + k * num_features));

        for (b, list) in features.outer_iter().enumerate() {
            for g in 0..groups {
                let mut row = inputs.row_mut(b * groups + g);
                row.slice_mut(s![..c]).assign(&context.row(b));

                for j in 0..k {
                    let start = c + j * num_features;
                    row.slice_mut(s![start..start + num_features])
                        .assign(&list.row(g * k + j));
                }
            }
        }

        Ok(inputs)
    }

    /// Turns the `(groups, group_size)` network output back into `(lists, list_size)` scores.
    fn ungroup(&self, out: Array2<f32>, shape: (usize, usize)) -> Result<Array2<f32>> {
        let got = out.len();
        out.into_shape_with_order(shape)
            .map_err(|_| RankErr::SizeMismatch {
                what: "scores",
                got,
                expected: shape.0 * shape.1,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeaturePolicy, ListAssembler, Query, Record};
    use ndarray::{Array1, array};
    use rand::{SeedableRng, rngs::StdRng};

    fn params(n: usize) -> Vec<f32> {
        (0..n).map(|i| ((i * 37) % 11) as f32 / 11. - 0.5).collect()
    }

    #[test]
    fn layer_shapes_follow_config() {
        let scorer = GroupwiseScorer::new(2, 3, 2, &[4, 5], ActFn::Relu).unwrap();
        let dims: Vec<_> = scorer.layers().iter().map(Dense::dim).collect();

        assert_eq!(dims, [(8, 4), (4, 5), (5, 2)]);
        assert_eq!(scorer.num_params(), 9 * 4 + 5 * 5 + 6 * 2);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(GroupwiseScorer::new(0, 0, 1, &[], ActFn::Relu).is_err());
        assert!(GroupwiseScorer::new(0, 3, 0, &[], ActFn::Relu).is_err());
        assert!(GroupwiseScorer::new(0, 3, 1, &[4, 0], ActFn::Relu).is_err());
    }

    #[test]
    fn linear_pointwise_score() {
        let scorer = GroupwiseScorer::new(1, 2, 1, &[], ActFn::Relu).unwrap();
        // w = [ctx: 1, f1: 2, f2: -1], b = 0.5
        let params = [1., 2., -1., 0.5];
        let list = array![[1., 1.], [0., 3.], [2., 0.]];

        let scores = scorer
            .score_list(&params, array![10.].view(), list.view())
            .unwrap();

        assert_eq!(scores, array![11.5, 7.5, 14.5]);
    }

    #[test]
    fn score_checks_group_size() {
        let scorer = GroupwiseScorer::new(0, 2, 2, &[], ActFn::Relu).unwrap();
        let params = params(scorer.num_params());
        let empty = Array1::zeros(0);

        assert!(scorer.score(&params, empty.view(), array![[1., 2.]].view()).is_err());
        assert!(scorer
            .score_list(&params, empty.view(), Array2::zeros((3, 2)).view())
            .is_err());
        assert_eq!(
            scorer
                .score(&params, empty.view(), Array2::zeros((2, 2)).view())
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn pointwise_scores_do_not_depend_on_how_the_list_is_split() {
        let scorer = GroupwiseScorer::new(0, 3, 1, &[4], ActFn::Tanh).unwrap();
        let params = params(scorer.num_params());
        let list = Array2::from_shape_fn((6, 3), |(i, j)| (i as f32 - j as f32) / 3.);
        let empty = Array1::zeros(0);

        let whole = scorer.score_list(&params, empty.view(), list.view()).unwrap();
        let one_by_one: Vec<f32> = list
            .outer_iter()
            .flat_map(|doc| {
                scorer
                    .score(&params, empty.view(), doc.insert_axis(Axis(0)))
                    .unwrap()
                    .to_vec()
            })
            .collect();

        assert_eq!(whole.len(), one_by_one.len());
        for (a, b) in whole.iter().zip(&one_by_one) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn block_diagonal_group_scorer_matches_pointwise_scorer() {
        const NF: usize = 2;
        const C: usize = 1;
        const K: usize = 3;

        // pointwise: w = [ctx, f1, f2], b
        let pointwise = GroupwiseScorer::new(C, NF, 1, &[], ActFn::Relu).unwrap();
        let point_params = [0.5, -1., 2., 0.25];

        // groupwise with no cross-document interaction: column j only reads doc j
        let groupwise = GroupwiseScorer::new(C, NF, K, &[], ActFn::Relu).unwrap();
        let inputs = C + K * NF;
        let mut w = Array2::<f32>::zeros((inputs, K));
        for j in 0..K {
            w[[0, j]] = point_params[0];
            for f in 0..NF {
                w[[C + j * NF + f, j]] = point_params[1 + f];
            }
        }
        let mut group_params = w.into_raw_vec_and_offset().0;
        group_params.extend([point_params[3]; K]);
        assert_eq!(group_params.len(), groupwise.num_params());

        let list = Array2::from_shape_fn((6, NF), |(i, j)| (i * NF + j) as f32 * 0.1);
        let context = array![2.];

        let a = pointwise
            .score_list(&point_params, context.view(), list.view())
            .unwrap();
        let b = groupwise
            .score_list(&group_params, context.view(), list.view())
            .unwrap();

        for (a, b) in a.iter().zip(&b) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn interacting_group_scorer_sees_neighbours() {
        let scorer = GroupwiseScorer::new(0, 1, 2, &[], ActFn::Relu).unwrap();
        // score_0 = doc_1, score_1 = doc_0
        let params = [0., 1., 1., 0., 0., 0.];
        let empty = Array1::zeros(0);

        let scores = scorer
            .score(&params, empty.view(), array![[3.], [5.]].view())
            .unwrap();

        assert_eq!(scores, array![5., 3.]);
    }

    #[test]
    fn batch_scores_align_with_slots() {
        let assembler = ListAssembler::new(4, 2, FeaturePolicy::Ignore).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let lists: Vec<_> = (0..3u64)
            .map(|qid| {
                let records = (0..3)
                    .map(|i| Record::new(qid, 1., vec![(1, qid as f32), (2, i as f32)]))
                    .collect();
                assembler.assemble(&Query::new(qid, records), &mut rng).unwrap()
            })
            .collect();

        let batch = Batch::from_lists(&lists, 3, 4, 2).unwrap();
        let scorer = GroupwiseScorer::new(0, 2, 2, &[3], ActFn::Relu).unwrap();
        let params = params(scorer.num_params());

        let scores = scorer.score_batch(&params, &batch).unwrap();
        assert_eq!(scores.dim(), (3, 4));

        let empty = Array1::zeros(0);
        for (list, row) in lists.iter().zip(scores.outer_iter()) {
            let expected = scorer
                .score_list(&params, empty.view(), list.features())
                .unwrap();
            for (a, b) in row.iter().zip(&expected) {
                assert!((a - b).abs() < 1e-6, "{a} vs {b}");
            }
        }

        let (cached, _) = scorer.forward_cached(&params, &batch).unwrap();
        assert_eq!(cached, scores);
    }
}
