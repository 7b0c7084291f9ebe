use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::info;
use ranking::data::{ListAssembler, ListDataset, QueryGrouper, Records};

use crate::{
    config::TrainingConfig,
    error::{Result, TrainerErr},
};

/// Reads LETOR records from `reader` and assembles one list per query.
///
/// # Arguments
/// * `reader` - The source of `<label> qid:<id> <idx>:<value> ...` lines.
/// * `config` - The list shape and the input policies.
/// * `seed` - Seeds the per-query truncation shuffles.
///
/// # Returns
/// The dataset, or the first parse, ordering or schema error found.
pub fn read_lists<R: BufRead>(
    reader: R,
    config: &TrainingConfig,
    seed: u64,
) -> Result<ListDataset> {
    let records = Records::new(reader);
    let queries = QueryGrouper::new(records, config.order_policy())
        .collect::<ranking::Result<Vec<_>>>()?;

    let assembler =
        ListAssembler::new(config.list_size, config.num_features, config.feature_policy())?;
    let lists = assembler.assemble_all(&queries, seed)?;

    let dataset = ListDataset::new(lists, config.list_size, config.num_features)?;
    let docs: usize = queries.iter().map(|q| q.len()).sum();
    info!(
        "read {} queries, kept {} of {docs} documents",
        dataset.len(),
        dataset.num_docs()
    );

    Ok(dataset)
}

/// Same as `read_lists` for the file at `path`.
pub fn load_lists(path: &Path, config: &TrainingConfig, seed: u64) -> Result<ListDataset> {
    let file = File::open(path).map_err(|source| TrainerErr::Io {
        path: path.display().to_string(),
        source,
    })?;

    info!("loading {}", path.display());
    read_lists(BufReader::new(file), config, seed)
}
