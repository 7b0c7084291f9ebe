use ndarray::{Array2, ArrayView2};

use super::{Dense, DenseTape};
use crate::{RankErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Dense::size).sum()
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer of every layer, in order.
    /// * `x` - The input data, one sample per row.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params(params.len())?;

        let mut offset = 0;
        let mut x = x.to_owned();

        for layer in &self.layers {
            let size = layer.size();
            x = layer.forward(&params[offset..offset + size], x.view())?;
            offset += size;
        }

        Ok(x)
    }

    /// Makes a forward pass keeping every layer's tape for a later `backward`.
    pub fn forward_cached(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, Vec<DenseTape>)> {
        self.check_params(params.len())?;

        let mut offset = 0;
        let mut tapes = Vec::with_capacity(self.layers.len());
        let mut x = x.to_owned();

        for layer in &self.layers {
            let size = layer.size();
            let (a, tape) = layer.forward_cached(&params[offset..offset + size], x.view())?;
            tapes.push(tape);
            x = a;
            offset += size;
        }

        Ok((x, tapes))
    }

    /// Back propagates `d`, the derivative of the loss with respect to the network's output,
    /// adding every layer's gradient into `grad`.
    pub fn backward(
        &self,
        params: &[f32],
        grad: &mut [f32],
        tapes: &[DenseTape],
        mut d: Array2<f32>,
    ) -> Result<()> {
        self.check_params(params.len())?;
        self.check_params(grad.len())?;

        if tapes.len() != self.layers.len() {
            return Err(RankErr::SizeMismatch {
                what: "layer tapes",
                got: tapes.len(),
                expected: self.layers.len(),
            });
        }

        let mut end = params.len();

        for (layer, tape) in self.layers.iter().zip(tapes).rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], tape, d)?;
            end = start;
        }

        Ok(())
    }

    fn check_params(&self, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(RankErr::SizeMismatch {
                what: "model parameters",
                got,
                expected,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ActFn;
    use ndarray::array;

    fn model() -> Sequential {
        Sequential::new([
            Dense::new((2, 3), Some(ActFn::sigmoid(1.))),
            Dense::new((3, 1), None),
        ])
    }

    #[test]
    fn size_is_sum_of_layers() {
        assert_eq!(model().size(), 9 + 4);
    }

    #[test]
    fn cached_forward_matches_forward() {
        let model = model();
        let params: Vec<f32> = (0..model.size()).map(|i| (i as f32 - 6.) / 10.).collect();
        let x = array![[0.5, -1.], [2., 0.25]];

        let y = model.forward(&params, x.view()).unwrap();
        let (y_cached, tapes) = model.forward_cached(&params, x.view()).unwrap();

        assert_eq!(y, y_cached);
        assert_eq!(tapes.len(), 2);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let model = model();
        let params: Vec<f32> = (0..model.size()).map(|i| ((i * 7) % 5) as f32 / 5. - 0.4).collect();
        let x = array![[0.5, -1.], [2., 0.25], [-0.3, 0.8]];

        let loss = |p: &[f32]| model.forward(p, x.view()).unwrap().mapv(|y| y * y).sum();

        let (y, tapes) = model.forward_cached(&params, x.view()).unwrap();
        let mut grad = vec![0.; model.size()];
        model
            .backward(&params, &mut grad, &tapes, y.mapv(|y| 2. * y))
            .unwrap();

        let eps = 1e-3;
        for i in 0..params.len() {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[i] += eps;
            minus[i] -= eps;

            let numeric = (loss(&plus) - loss(&minus)) / (2. * eps);
            assert!((numeric - grad[i]).abs() < 2e-2, "param {i}: {numeric} vs {}", grad[i]);
        }
    }

    #[test]
    fn rejects_wrong_parameter_count() {
        let model = model();
        let x = array![[0., 0.]];
        assert!(model.forward(&[0.; 3], x.view()).is_err());
    }
}
