mod constant;
mod param_gen;
mod random;

pub use constant::ConstParamGen;
pub use param_gen::ParamGen;
pub use random::RandParamGen;

use rand::Rng;

use crate::{RankErr, Result, arch::GroupwiseScorer};

/// Generates the initial parameters of a scorer: Xavier uniform weights and zero biases.
///
/// # Arguments
/// * `scorer` - The scorer whose layer shapes dictate the layout.
/// * `rng` - A random number generator.
///
/// # Returns
/// A flat buffer of `scorer.num_params()` values.
pub fn init_params<R: Rng>(scorer: &GroupwiseScorer, rng: &mut R) -> Result<Vec<f32>> {
    let mut params = Vec::with_capacity(scorer.num_params());

    for layer in scorer.layers() {
        let (fan_in, fan_out) = layer.dim();
        let w_size = layer.weights_size();
        let b_size = layer.size() - w_size;

        let weights = RandParamGen::xavier_uniform(rng, w_size, fan_in, fan_out)?.sample(w_size);
        let biases = ConstParamGen::new(0., b_size).sample(b_size);

        for (sample, n) in [(weights, w_size), (biases, b_size)] {
            let sample = sample.unwrap_or_default();
            if sample.len() != n {
                return Err(RankErr::SizeMismatch {
                    what: "initial parameters",
                    got: sample.len(),
                    expected: n,
                });
            }
            params.extend(sample);
        }
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ActFn;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn fills_every_parameter_with_zero_biases() {
        let scorer = GroupwiseScorer::new(0, 3, 1, &[2], ActFn::Relu).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let params = init_params(&scorer, &mut rng).unwrap();

        assert_eq!(params.len(), scorer.num_params());
        // layer 0: 6 weights then 2 biases, layer 1: 2 weights then 1 bias
        assert!(params[..6].iter().any(|&w| w != 0.));
        assert_eq!(&params[6..8], &[0., 0.]);
        assert_eq!(params[10], 0.);
    }

    #[test]
    fn is_reproducible_from_seed() {
        let scorer = GroupwiseScorer::new(1, 4, 2, &[3], ActFn::Tanh).unwrap();
        let a = init_params(&scorer, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = init_params(&scorer, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }
}
