mod assembler;
mod batch;
mod grouping;
mod list;
mod parse;
mod record;

pub use assembler::{FeaturePolicy, ListAssembler};
pub use batch::{Batch, ListDataset};
pub use grouping::{OrderPolicy, QueryGrouper};
pub use list::List;
pub use parse::{Records, parse_line};
pub use record::{MAX_LABEL, PADDING_LABEL, Query, Record, is_valid_label};
