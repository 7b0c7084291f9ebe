use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, linalg};

use super::ActFn;
use crate::{RankErr, Result};

/// What a dense layer remembers from a forward pass to run its backward pass.
#[derive(Debug, Clone)]
pub struct DenseTape {
    x: Array2<f32>,
    z: Array2<f32>,
}

/// A fully connected layer, `a = act_fn(x · w + b)`.
///
/// The layer does not own its parameters. They live in a flat slice laid out as the row-major
/// `(n, m)` weights followed by the `m` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The `(inputs, outputs)` dimensions of the layer.
    /// * `act_fn` - The activation applied to the output, `None` for a linear layer.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// The amount of leading parameters that are weights, the rest are biases.
    pub fn weights_size(&self) -> usize {
        self.dim.0 * self.dim.1
    }

    /// Computes the output of the layer for the rows of `x`.
    pub fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut z = self.affine(params, x)?;

        if let Some(act_fn) = &self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }

    /// Same as `forward`, also returning what `backward` needs.
    pub fn forward_cached(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, DenseTape)> {
        let z = self.affine(params, x)?;

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        Ok((
            a,
            DenseTape {
                x: x.to_owned(),
                z,
            },
        ))
    }

    /// Back propagates `d`, the derivative of the loss with respect to this layer's output.
    ///
    /// The parameter gradient is **added** to `grad`, so several passes can be accumulated.
    ///
    /// # Returns
    /// The derivative of the loss with respect to this layer's input.
    pub fn backward(
        &self,
        params: &[f32],
        grad: &mut [f32],
        tape: &DenseTape,
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&tape.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &tape.x.t(), &d, 1.0, &mut dw);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    fn affine(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(RankErr::SizeMismatch {
                what: "dense layer input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = x.dot(&w);
        z += &b;
        Ok(z)
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("dense layer gradient", grad.len())?;

        let (dw_raw, db_raw) = grad.split_at_mut(self.weights_size());
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.mismatch())?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).map_err(|_| self.mismatch())?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("dense layer parameters", params.len())?;

        let (w_raw, b_raw) = params.split_at(self.weights_size());
        let w = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.mismatch())?;
        let b = ArrayView1::from_shape(self.dim.1, b_raw).map_err(|_| self.mismatch())?;
        Ok((w, b))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(RankErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }

    fn mismatch(&self) -> RankErr {
        RankErr::SizeMismatch {
            what: "dense layer shape",
            got: self.size,
            expected: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn forward_computes_affine_transform() {
        // w = [[1, 2], [3, 4], [5, 6]], b = [0.5, -1]
        let params = [1., 2., 3., 4., 5., 6., 0.5, -1.];
        let layer = Dense::new((3, 2), None);
        let x = array![[1., 0., 1.], [0., 1., 0.]];

        let y = layer.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[6.5, 7.], [3.5, 3.]]);
    }

    #[test]
    fn rejects_wrong_sizes() {
        let layer = Dense::new((2, 1), None);
        let x = array![[1., 2.]];

        assert!(layer.forward(&[0.; 2], x.view()).is_err());
        assert!(layer.forward(&[0.; 3], array![[1.]].view()).is_err());
    }

    #[test]
    fn backward_matches_finite_differences() {
        let layer = Dense::new((2, 2), Some(ActFn::Tanh));
        let params = [0.3, -0.2, 0.5, 0.1, 0.05, -0.4];
        let x = array![[0.7, -1.2], [0.4, 0.9]];

        // loss = sum of outputs, so d = ones
        let loss = |p: &[f32]| layer.forward(p, x.view()).unwrap().sum();

        let (y, tape) = layer.forward_cached(&params, x.view()).unwrap();
        let mut grad = [0.; 6];
        layer
            .backward(&params, &mut grad, &tape, Array2::ones(y.dim()))
            .unwrap();

        let eps = 1e-3;
        for i in 0..params.len() {
            let mut plus = params;
            let mut minus = params;
            plus[i] += eps;
            minus[i] -= eps;

            let numeric = (loss(&plus) - loss(&minus)) / (2. * eps);
            assert!((numeric - grad[i]).abs() < 1e-2, "param {i}: {numeric} vs {}", grad[i]);
        }
    }

    #[test]
    fn backward_accumulates() {
        let layer = Dense::new((1, 1), None);
        let params = [2., 0.];
        let x = array![[3.]];

        let (_, tape) = layer.forward_cached(&params, x.view()).unwrap();
        let mut grad = [1., 1.];
        let dx = layer
            .backward(&params, &mut grad, &tape, array![[1.]])
            .unwrap();

        assert_eq!(grad, [4., 2.]);
        assert_eq!(dx, array![[2.]]);
    }
}
