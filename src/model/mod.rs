//! Shark presence scoring.
//!
//! Everything that turns covariates into a presence probability implements
//! [`PresenceScorer`]. Two closed-form scorers ([`HeuristicScorer`] and
//! [`LinearBlendScorer`]) serve as training targets; the learned
//! [`TrainedModel`], a bagged regression-tree ensemble, is what the grid
//! renderer actually uses.

mod config;
mod evaluation;
mod forest;
mod heuristic;
mod train;

pub use config::{ModelConfig, TrainingTarget};
pub use evaluation::{mean_squared_error, r2_score, train_test_split, ModelMetrics};
pub use forest::{ForestParams, RandomForest, RegressionTree};
pub use heuristic::{heuristic_score, HeuristicScorer, LinearBlendScorer, BLEND_WEIGHTS};
pub use train::{train_model, TrainedModel};

use rayon::prelude::*;
use thiserror::Error;

use crate::samples::Covariates;

/// Errors raised while building or training a model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("training target has zero variance (all labels equal {0})")]
    ZeroVarianceTarget(f64),
    #[error("cannot normalize blended scores: corpus maximum is {0}")]
    ZeroMaxScore(f64),
    #[error("training target contains non-finite values")]
    NonFiniteTarget,
    #[error("not enough samples to split {samples} rows with test fraction {test_fraction}")]
    InsufficientData { samples: usize, test_fraction: f64 },
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),
}

/// Maps environmental covariates to a presence probability in [0, 1].
pub trait PresenceScorer: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Presence probability for one covariate vector. Must stay within
    /// [0, 1] for every input, including values outside the training range.
    fn score(&self, covariates: &Covariates) -> f64;

    /// Scores many rows in parallel; output is aligned with `rows`.
    fn score_batch(&self, rows: &[Covariates]) -> Vec<f64> {
        rows.par_iter().map(|c| self.score(c)).collect()
    }
}
