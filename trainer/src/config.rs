use std::{fs, path::PathBuf};

use ranking::{
    arch::ActFn,
    data::{FeaturePolicy, OrderPolicy},
    loss::LossKind,
    optimization::{Adam, GradientDescent, Optimizer},
};
use serde::Deserialize;

use crate::error::{Result, TrainerErr};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnConfig {
    Relu,
    Sigmoid { amp: f32 },
    Tanh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnConfig {
    PairwiseLogistic,
    PairwiseHinge,
    Softmax,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam { lr: f32, b1: f32, b2: f32, eps: f32 },
    GradientDescent { lr: f32 },
}

/// What to do with a query id that shows up again after its query ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsortedInputConfig {
    #[default]
    Fragment,
    Reject,
}

/// What to do with a feature index outside `1..=num_features`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangeConfig {
    #[default]
    Ignore,
    Reject,
}

/// The complete description of a training run, read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingConfig {
    pub train_path: PathBuf,
    #[serde(default)]
    pub test_path: Option<PathBuf>,
    pub num_features: usize,
    pub list_size: usize,
    pub batch_size: usize,
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default)]
    pub context_features: usize,
    #[serde(default)]
    pub hidden_layer_dims: Vec<usize>,
    #[serde(default = "default_activation")]
    pub activation: ActFnConfig,
    pub loss: LossFnConfig,
    #[serde(default = "default_metric_cutoffs")]
    pub metric_cutoffs: Vec<usize>,
    pub optimizer: OptimizerConfig,
    pub epochs: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub unsorted_input: UnsortedInputConfig,
    #[serde(default)]
    pub out_of_range_features: OutOfRangeConfig,
}

fn default_group_size() -> usize {
    1
}

fn default_activation() -> ActFnConfig {
    ActFnConfig::Relu
}

fn default_metric_cutoffs() -> Vec<usize> {
    vec![1, 3, 5, 10]
}

impl TrainingConfig {
    /// Parses and validates a configuration from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| TrainerErr::Io {
            path: path.to_string(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Checks every value that would make training impossible.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("num_features", self.num_features),
            ("list_size", self.list_size),
            ("batch_size", self.batch_size),
            ("group_size", self.group_size),
            ("epochs", self.epochs),
        ] {
            if value == 0 {
                return Err(invalid(format!("{name} must be greater than 0")));
            }
        }

        if self.list_size % self.group_size != 0 {
            return Err(invalid(format!(
                "list_size ({}) must be a multiple of group_size ({})",
                self.list_size, self.group_size
            )));
        }

        // context features have no input source yet
        if self.context_features != 0 {
            return Err(invalid("context_features are not read from LETOR files, use 0"));
        }

        if self.hidden_layer_dims.contains(&0) {
            return Err(invalid("hidden_layer_dims must be greater than 0"));
        }

        if self.metric_cutoffs.is_empty() || self.metric_cutoffs.contains(&0) {
            return Err(invalid("metric_cutoffs must be a non empty list of positive values"));
        }

        let lr = match self.optimizer {
            OptimizerConfig::Adam { lr, .. } | OptimizerConfig::GradientDescent { lr } => lr,
        };
        if !(lr.is_finite() && lr > 0.) {
            return Err(invalid(format!("learning rate must be positive, got {lr}")));
        }

        Ok(())
    }

    pub fn act_fn(&self) -> ActFn {
        match self.activation {
            ActFnConfig::Relu => ActFn::Relu,
            ActFnConfig::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnConfig::Tanh => ActFn::Tanh,
        }
    }

    pub fn loss_kind(&self) -> LossKind {
        match self.loss {
            LossFnConfig::PairwiseLogistic => LossKind::PairwiseLogistic,
            LossFnConfig::PairwiseHinge => LossKind::PairwiseHinge,
            LossFnConfig::Softmax => LossKind::Softmax,
        }
    }

    pub fn order_policy(&self) -> OrderPolicy {
        match self.unsorted_input {
            UnsortedInputConfig::Fragment => OrderPolicy::Fragment,
            UnsortedInputConfig::Reject => OrderPolicy::Reject,
        }
    }

    pub fn feature_policy(&self) -> FeaturePolicy {
        match self.out_of_range_features {
            OutOfRangeConfig::Ignore => FeaturePolicy::Ignore,
            OutOfRangeConfig::Reject => FeaturePolicy::Reject,
        }
    }

    /// Builds the configured optimizer for `len` parameters.
    pub fn optimizer(&self, len: usize) -> Box<dyn Optimizer> {
        match self.optimizer {
            OptimizerConfig::Adam { lr, b1, b2, eps } => {
                Box::new(Adam::new(len, lr, b1, b2, eps))
            }
            OptimizerConfig::GradientDescent { lr } => Box::new(GradientDescent::new(lr)),
        }
    }
}

fn invalid(msg: impl Into<String>) -> TrainerErr {
    TrainerErr::InvalidConfig(msg.into())
}
