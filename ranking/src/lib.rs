pub mod arch;
pub mod data;
pub mod error;
pub mod initialization;
pub mod loss;
pub mod metrics;
pub mod optimization;

pub use error::{ParseErr, ParseReason, RankErr, Result};
