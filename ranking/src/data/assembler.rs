use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array1, Array2, ArrayViewMut1};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use rayon::prelude::*;

use super::{List, PADDING_LABEL, Query, Record};
use crate::{RankErr, Result};

/// What to do with a feature index outside of `1..=num_features`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeaturePolicy {
    /// Drop the feature, the format allows sparse extra columns.
    #[default]
    Ignore,
    /// Fail with `RankErr::SchemaViolation`.
    Reject,
}

/// Turns the records of a query into a fixed-size `List`.
#[derive(Debug, Clone, Copy)]
pub struct ListAssembler {
    list_size: NonZeroUsize,
    num_features: NonZeroUsize,
    policy: FeaturePolicy,
}

impl ListAssembler {
    /// Creates a new `ListAssembler`.
    ///
    /// # Arguments
    /// * `list_size` - The amount of slots of every produced list.
    /// * `num_features` - The width of the feature schema.
    /// * `policy` - How to treat out of range feature indices.
    ///
    /// # Returns
    /// A new `ListAssembler` or an `InvalidConfig` error if any of the sizes is zero.
    pub fn new(list_size: usize, num_features: usize, policy: FeaturePolicy) -> Result<Self> {
        let list_size = NonZeroUsize::new(list_size)
            .ok_or_else(|| RankErr::InvalidConfig("list_size must be greater than 0".into()))?;
        let num_features = NonZeroUsize::new(num_features)
            .ok_or_else(|| RankErr::InvalidConfig("num_features must be greater than 0".into()))?;

        Ok(Self {
            list_size,
            num_features,
            policy,
        })
    }

    #[inline]
    pub fn list_size(&self) -> usize {
        self.list_size.get()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.num_features.get()
    }

    /// Assembles the list of a single query.
    ///
    /// Queries that fit keep their original relative order and get padded at the end. Longer
    /// queries are randomly permuted and then truncated to `list_size`.
    ///
    /// # Arguments
    /// * `query` - The query's records.
    /// * `rng` - The random source, only used for the truncation shuffle.
    ///
    /// # Returns
    /// The assembled list or a `SchemaViolation` if the policy rejects a feature index.
    pub fn assemble<R: Rng + ?Sized>(&self, query: &Query, rng: &mut R) -> Result<List> {
        let list_size = self.list_size();
        let mut records: Vec<&Record> = query.records.iter().collect();

        if records.len() > list_size {
            debug!(
                "truncating query {} from {} to {list_size} documents",
                query.qid,
                records.len()
            );
            records.shuffle(rng);
            records.truncate(list_size);
        }

        let mut features = Array2::zeros((list_size, self.num_features()));
        let mut labels = Array1::from_elem(list_size, PADDING_LABEL);

        for (slot, record) in records.iter().enumerate() {
            self.densify(record, features.row_mut(slot))?;
            labels[slot] = record.label();
        }

        Ok(List::new(Some(query.qid), features, labels, records.len()))
    }

    /// Assembles every query in parallel.
    ///
    /// Each query gets its own rng derived from `seed` and its position, so the result does not
    /// depend on how the work is scheduled.
    pub fn assemble_all(&self, queries: &[Query], seed: u64) -> Result<Vec<List>> {
        queries
            .par_iter()
            .enumerate()
            .map(|(i, query)| {
                let mut rng = StdRng::seed_from_u64(query_seed(seed, i));
                self.assemble(query, &mut rng)
            })
            .collect()
    }

    fn densify(&self, record: &Record, mut row: ArrayViewMut1<f32>) -> Result<()> {
        let num_features = self.num_features();

        for &(index, value) in record.features() {
            if (1..=num_features).contains(&index) {
                row[index - 1] = value;
                continue;
            }

            match self.policy {
                FeaturePolicy::Ignore => {
                    debug!("query {}: ignoring feature index {index}", record.qid())
                }
                FeaturePolicy::Reject => {
                    return Err(RankErr::SchemaViolation {
                        index,
                        num_features,
                    });
                }
            }
        }

        Ok(())
    }
}

fn query_seed(seed: u64, position: usize) -> u64 {
    seed ^ (position as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
