mod accumulator;
mod ranking;

pub use accumulator::{Metric, MetricsAccumulator, batch_ndcg_at_k};
pub use ranking::{dcg, mrr, ndcg_at_cutoffs, ndcg_at_k, rank_slots};
