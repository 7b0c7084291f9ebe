use ndarray::{ArrayView1, ArrayViewMut1};

use super::{Optimizer, optimizer::check_lens};
use crate::Result;

/// Plain gradient descent, `params -= learning_rate * grad`.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_lens(grad, params)?;

        let mut params = ArrayViewMut1::from(params);
        params.scaled_add(-self.learning_rate, &ArrayView1::from(grad));

        Ok(())
    }
}
