use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire ranking module.
pub type Result<T> = std::result::Result<T, RankErr>;

/// The reason a record line could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseReason {
    InvalidUtf8,
    InvalidLabel(String),
    MissingQid,
    InvalidQid(String),
    InvalidFeature(String),
}

impl Display for ParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseReason::InvalidUtf8 => write!(f, "line is not valid UTF-8"),
            ParseReason::InvalidLabel(tok) => write!(f, "invalid relevance label '{tok}'"),
            ParseReason::MissingQid => write!(f, "missing 'qid:<id>' token"),
            ParseReason::InvalidQid(tok) => write!(f, "invalid query id token '{tok}'"),
            ParseReason::InvalidFeature(tok) => write!(f, "malformed feature token '{tok}'"),
        }
    }
}

/// A malformed input line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErr {
    pub line: usize,
    pub reason: ParseReason,
}

impl Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl Error for ParseErr {}

/// The ranking module's error type.
#[derive(Debug)]
pub enum RankErr {
    Parse(ParseErr),
    SchemaViolation {
        index: usize,
        num_features: usize,
    },
    UnsortedInput {
        qid: u64,
    },
    InvalidConfig(String),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Io(std::io::Error),
}

impl Display for RankErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankErr::Parse(e) => write!(f, "parse error at {e}"),
            RankErr::SchemaViolation {
                index,
                num_features,
            } => write!(
                f,
                "feature index {index} is outside of the schema range 1..={num_features}"
            ),
            RankErr::UnsortedInput { qid } => write!(
                f,
                "query {qid} reappeared after a different query started, \
                 input is not sorted by query id"
            ),
            RankErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            RankErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            RankErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for RankErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RankErr::Parse(e) => Some(e),
            RankErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseErr> for RankErr {
    fn from(value: ParseErr) -> Self {
        Self::Parse(value)
    }
}

impl From<std::io::Error> for RankErr {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
