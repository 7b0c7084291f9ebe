mod activations;
mod dense;
mod scorer;
mod sequential;

pub use activations::{ActFn, Sigmoid, stable_sigmoid};
pub use dense::{Dense, DenseTape};
pub use scorer::{GroupwiseScorer, ScorerTape};
pub use sequential::Sequential;
