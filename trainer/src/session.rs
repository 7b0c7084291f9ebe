use std::{num::NonZeroUsize, time::Instant};

use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use ranking::{
    arch::GroupwiseScorer,
    data::ListDataset,
    initialization::init_params,
    loss::{LossFn, LossKind},
    metrics::{Metric, MetricsAccumulator},
};

use crate::{
    config::TrainingConfig,
    error::{Result, TrainerErr},
    ingest,
};

/// The outcome of one training epoch.
#[derive(Debug, Clone)]
pub struct EpochReport {
    pub epoch: usize,
    /// Mean list loss over the training set, measured while training.
    pub train_loss: f32,
    /// Loss and metrics of the test set after the epoch, if there is one.
    pub test: Option<Evaluation>,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub loss: f32,
    pub metrics: Vec<Metric>,
}

/// The loss of several batches, each weighted by the amount of lists that contributed to it.
#[derive(Debug, Default, Clone, Copy)]
struct LossMean {
    sum: f64,
    lists: usize,
}

impl LossMean {
    fn push(&mut self, (loss, lists): (f32, usize)) {
        self.sum += loss as f64 * lists as f64;
        self.lists += lists;
    }

    fn value(&self) -> f32 {
        if self.lists == 0 {
            0.
        } else {
            (self.sum / self.lists as f64) as f32
        }
    }
}

/// A training run over in-memory datasets.
pub struct Session {
    config: TrainingConfig,
    scorer: GroupwiseScorer,
    loss: LossKind,
    batch_size: NonZeroUsize,
    train: ListDataset,
    test: Option<ListDataset>,
    rng: StdRng,
}

impl Session {
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `config` - A validated training configuration.
    /// * `train` - The lists to train on.
    /// * `test` - The lists to evaluate on after every epoch.
    /// * `seed` - Seeds parameter initialization and the epoch shuffles.
    ///
    /// # Returns
    /// A new `Session` or an error if the datasets disagree with the configuration.
    pub fn new(
        config: TrainingConfig,
        train: ListDataset,
        test: Option<ListDataset>,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;

        let datasets = [("train", Some(&train)), ("test", test.as_ref())];
        for (name, data) in datasets {
            if let Some(data) = data {
                check_shape(name, data, &config)?;
            }
        }

        let batch_size = NonZeroUsize::new(config.batch_size).ok_or_else(|| {
            TrainerErr::InvalidConfig("batch_size must be greater than 0".into())
        })?;

        let scorer = GroupwiseScorer::new(
            config.context_features,
            config.num_features,
            config.group_size,
            &config.hidden_layer_dims,
            config.act_fn(),
        )?;

        Ok(Self {
            loss: config.loss_kind(),
            config,
            scorer,
            batch_size,
            train,
            test,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Reads the train and test files named by `config` and creates a `Session` for them.
    pub fn from_config(config: TrainingConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        info!("seed {seed}");

        let mut rng = StdRng::seed_from_u64(seed);
        let train = ingest::load_lists(&config.train_path, &config, rng.random())?;
        let test = match &config.test_path {
            Some(path) => Some(ingest::load_lists(path, &config, rng.random())?),
            None => None,
        };

        Self::new(config, train, test, rng.random())
    }

    pub fn scorer(&self) -> &GroupwiseScorer {
        &self.scorer
    }

    /// Trains for the configured amount of epochs.
    ///
    /// # Returns
    /// The final parameters of the scorer and one report per epoch.
    pub fn run(mut self) -> Result<(Vec<f32>, Vec<EpochReport>)> {
        let mut params = init_params(&self.scorer, &mut self.rng)?;
        let mut optimizer = self.config.optimizer(params.len());
        let mut grad = vec![0.; params.len()];

        info!(
            "training {} params on {} lists for {} epochs",
            params.len(),
            self.train.len(),
            self.config.epochs
        );

        let mut reports = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            let start = Instant::now();
            self.train.shuffle(&mut self.rng);

            let mut mean = LossMean::default();

            for (i, batch) in self.train.batches(self.batch_size).enumerate() {
                let batch = batch?;

                let (scores, tape) = self.scorer.forward_cached(&params, &batch)?;
                let (loss, lists) = self.loss.loss_with_count(scores.view(), batch.labels())?;
                let d_scores = self.loss.loss_prime(scores.view(), batch.labels())?;

                grad.fill(0.);
                self.scorer
                    .backward(&params, &mut grad, &tape, d_scores.view())?;
                optimizer.update_params(&grad, &mut params)?;

                debug!("epoch {epoch} batch {i}: loss {loss:.6} over {lists} lists");
                mean.push((loss, lists));
            }

            let train_loss = mean.value();
            info!(
                "epoch {epoch}/{}: train loss {train_loss:.6} ({:.2?})",
                self.config.epochs,
                start.elapsed()
            );

            let test = match &self.test {
                Some(test) => {
                    let eval = self.evaluate(&params, test)?;
                    let metrics: Vec<_> = eval.metrics.iter().map(Metric::to_string).collect();
                    info!(
                        "epoch {epoch}: test loss {:.6} {}",
                        eval.loss,
                        metrics.join(" ")
                    );
                    Some(eval)
                }
                None => None,
            };

            reports.push(EpochReport {
                epoch,
                train_loss,
                test,
            });
        }

        Ok((params, reports))
    }

    /// Scores `data` with `params`, returning its mean list loss and the configured metrics.
    pub fn evaluate(&self, params: &[f32], data: &ListDataset) -> Result<Evaluation> {
        check_shape("evaluation", data, &self.config)?;

        let mut acc = MetricsAccumulator::new(&self.config.metric_cutoffs);
        let mut mean = LossMean::default();

        for batch in data.batches(self.batch_size) {
            let batch = batch?;
            let scores = self.scorer.score_batch(params, &batch)?;

            mean.push(self.loss.loss_with_count(scores.view(), batch.labels())?);
            acc.add_batch(scores.view(), batch.labels())?;
        }

        Ok(Evaluation {
            loss: mean.value(),
            metrics: acc.results(),
        })
    }
}

fn check_shape(name: &str, data: &ListDataset, config: &TrainingConfig) -> Result<()> {
    let got = (data.list_size(), data.num_features());
    let expected = (config.list_size, config.num_features);

    if got != expected {
        return Err(TrainerErr::InvalidConfig(format!(
            "{name} lists are (list_size, num_features) = {got:?}, the config expects {expected:?}"
        )));
    }

    Ok(())
}
