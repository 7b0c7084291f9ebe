pub mod config;
pub mod error;
pub mod ingest;
pub mod session;

pub use config::TrainingConfig;
pub use error::{Result, TrainerErr};
pub use session::{EpochReport, Evaluation, Session};
