/// A logistic activation scaled by `amp`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp * stable_sigmoid(z)
    }

    pub fn df(&self, z: f32) -> f32 {
        let s = stable_sigmoid(z);
        self.amp * s * (1. - s)
    }
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new(1.)
    }
}

/// The activation function applied after a dense layer's affine transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActFn {
    Relu,
    Sigmoid(Sigmoid),
    Tanh,
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        ActFn::Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            ActFn::Relu => z.max(0.),
            ActFn::Sigmoid(a) => a.f(z),
            ActFn::Tanh => z.tanh(),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            ActFn::Relu => (z > 0.) as u8 as f32,
            ActFn::Sigmoid(a) => a.df(z),
            ActFn::Tanh => 1. - z.tanh().powi(2),
        }
    }
}

/// `1 / (1 + e^-z)` without overflowing for large `|z|`.
pub fn stable_sigmoid(z: f32) -> f32 {
    if z >= 0. {
        1. / (1. + (-z).exp())
    } else {
        let e = z.exp();
        e / (1. + e)
    }
}
