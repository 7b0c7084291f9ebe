use std::{fmt, io};

use ranking::RankErr;

/// The result type used in the entire trainer crate.
pub type Result<T> = std::result::Result<T, TrainerErr>;

/// All errors that can occur while configuring or running a training session.
#[derive(Debug)]
pub enum TrainerErr {
    /// A file could not be opened or read.
    Io { path: String, source: io::Error },
    /// The configuration file is not valid JSON or does not match the expected shape.
    Config(serde_json::Error),
    /// The configuration parsed but holds values that cannot be trained with.
    InvalidConfig(String),
    /// The ranking core failed, while ingesting data or during training.
    Ranking(RankErr),
}

impl fmt::Display for TrainerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read '{path}': {source}"),
            Self::Config(e) => write!(f, "invalid config file: {e}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Ranking(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TrainerErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Config(e) => Some(e),
            Self::Ranking(e) => Some(e),
            Self::InvalidConfig(_) => None,
        }
    }
}

impl From<serde_json::Error> for TrainerErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}

impl From<RankErr> for TrainerErr {
    fn from(e: RankErr) -> Self {
        Self::Ranking(e)
    }
}
