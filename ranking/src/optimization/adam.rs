use super::{Optimizer, optimizer::check_lens};
use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    mean: f32,
    var: f32,
}

/// Adam over the flat parameter buffer of a scorer.
///
/// A batch where no list contributes to the loss has an all-zero gradient. Such a step is
/// skipped entirely: the parameters, the moments and the bias correction step count are left
/// untouched, so padding-only batches do not decay the moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    steps: i32,
    moments: Box<[Moments]>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps: 0,
            moments: vec![Moments::default(); len].into_boxed_slice(),
        }
    }

    /// The amount of updates applied so far.
    pub fn steps(&self) -> usize {
        self.steps as usize
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_lens(grad, params)?;
        check_lens(&self.moments, params)?;

        if grad.iter().all(|&g| g == 0.) {
            return Ok(());
        }

        self.steps = self.steps.saturating_add(1);

        let (b1, b2) = (self.beta1, self.beta2);
        let bc1 = 1. - b1.powi(self.steps);
        let bc2 = 1. - b2.powi(self.steps);

        for ((p, &g), m) in params.iter_mut().zip(grad).zip(self.moments.iter_mut()) {
            m.mean = b1 * m.mean + (1. - b1) * g;
            m.var = b2 * m.var + (1. - b2) * g * g;

            let mean = m.mean / bc1;
            let var = m.var / bc2;
            *p -= self.learning_rate * mean / (var.sqrt() + self.epsilon);
        }

        Ok(())
    }
}
