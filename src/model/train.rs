//! Fits the random forest against a closed-form target.

use std::time::Instant;

use tracing::{debug, info};

use super::config::{ModelConfig, TrainingTarget};
use super::evaluation::{mean_squared_error, r2_score, train_test_split, ModelMetrics};
use super::forest::{FeatureRow, ForestParams, RandomForest};
use super::heuristic::{heuristic_score, LinearBlendScorer, BLEND_WEIGHTS};
use super::{ModelError, PresenceScorer};
use crate::samples::{CovariateRanges, Covariates, GeoSample, FEATURE_COUNT};

/// A forest trained on one corpus, with its hold-out metrics.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    forest: RandomForest,
    target: TrainingTarget,
    metrics: ModelMetrics,
}

impl TrainedModel {
    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn target(&self) -> TrainingTarget {
        self.target
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

impl PresenceScorer for TrainedModel {
    fn name(&self) -> &str {
        "random-forest"
    }

    fn score(&self, covariates: &Covariates) -> f64 {
        self.forest.predict(&covariates.to_array())
    }

    fn score_batch(&self, rows: &[Covariates]) -> Vec<f64> {
        let features: Vec<FeatureRow> = rows.iter().map(Covariates::to_array).collect();
        self.forest.predict_batch(&features)
    }
}

/// Labels each sample with the configured target score.
fn labels(samples: &[GeoSample], target: TrainingTarget) -> Result<Vec<f64>, ModelError> {
    match target {
        TrainingTarget::Heuristic => Ok(samples.iter().map(|s| heuristic_score(&s.covariates)).collect()),
        TrainingTarget::LinearBlend => {
            let scorer = LinearBlendScorer::fit(samples, CovariateRanges::default(), BLEND_WEIGHTS)?;
            Ok(samples.iter().map(|s| scorer.score(&s.covariates)).collect())
        }
    }
}

/// Trains a forest on `samples` and evaluates it on a held-out split.
///
/// # Arguments
/// * `samples` - Training corpus
/// * `config` - Target, split and forest parameters
///
/// # Returns
/// The trained model, or a [`ModelError`] when the corpus is empty, too small
/// to split, or produces a degenerate target.
pub fn train_model(samples: &[GeoSample], config: &ModelConfig) -> Result<TrainedModel, ModelError> {
    if samples.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    config.validate()?;

    let start = Instant::now();
    let y = labels(samples, config.target)?;
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteTarget);
    }
    if y.iter().all(|v| *v == y[0]) {
        return Err(ModelError::ZeroVarianceTarget(y[0]));
    }

    let (train_idx, test_idx) = train_test_split(samples.len(), config.test_fraction, config.split_seed)?;
    let gather_x = |idx: &[usize]| -> Vec<FeatureRow> { idx.iter().map(|&i| samples[i].covariates.to_array()).collect() };
    let gather_y = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| y[i]).collect() };

    let x_train = gather_x(&train_idx);
    let y_train = gather_y(&train_idx);
    let x_test = gather_x(&test_idx);
    let y_test = gather_y(&test_idx);

    let params = ForestParams {
        n_estimators: config.n_estimators,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        max_features: config.max_features.unwrap_or(FEATURE_COUNT),
        bootstrap: config.bootstrap,
        seed: config.forest_seed,
    };
    debug!(?params, n_train = x_train.len(), n_test = x_test.len(), "fitting forest");

    let forest = RandomForest::fit(&x_train, &y_train, &params);
    let predicted = forest.predict_batch(&x_test);

    let metrics = ModelMetrics {
        mse: mean_squared_error(&y_test, &predicted),
        r2: r2_score(&y_test, &predicted),
        n_train: x_train.len(),
        n_test: x_test.len(),
    };
    info!(
        training_target = ?config.target,
        trees = forest.n_trees(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "{metrics}"
    );

    Ok(TrainedModel {
        forest,
        target: config.target,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmask::tests::toy_world;
    use crate::samples::{generate_samples, SamplerConfig};

    fn corpus(n: usize) -> Vec<GeoSample> {
        generate_samples(&SamplerConfig::with_samples(n, 11), &toy_world()).unwrap()
    }

    #[test]
    fn test_train_reports_metrics() {
        let samples = corpus(200);
        let model = train_model(&samples, &ModelConfig::new(50, 0.2)).unwrap();

        let m = model.metrics();
        assert_eq!(m.n_test, 40);
        assert_eq!(m.n_train, 160);
        assert!(m.mse.is_finite() && m.mse >= 0.0);
        assert!(m.r2.is_finite() && m.r2 <= 1.0);
        assert_eq!(model.name(), "random-forest");
    }

    #[test]
    fn test_linear_blend_target_trains() {
        let samples = corpus(120);
        let config = ModelConfig {
            target: TrainingTarget::LinearBlend,
            ..ModelConfig::new(20, 0.25)
        };
        let model = train_model(&samples, &config).unwrap();
        assert_eq!(model.target(), TrainingTarget::LinearBlend);
        assert!(model.metrics().r2 <= 1.0);
    }

    #[test]
    fn test_predictions_bounded_on_extrapolation() {
        let samples = corpus(100);
        let model = train_model(&samples, &ModelConfig::new(10, 0.2)).unwrap();

        let far = Covariates::from_array([500.0, -40.0, 9e6, 1e3, -7.0]);
        let nan = Covariates::from_array([f64::NAN; 5]);
        for c in [far, nan] {
            let s = model.score(&c);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let samples = corpus(80);
        let config = ModelConfig::new(12, 0.2);
        let a = train_model(&samples, &config).unwrap();
        let b = train_model(&samples, &config).unwrap();
        assert_eq!(a.metrics(), b.metrics());
    }

    #[test]
    fn test_empty_corpus_is_degenerate() {
        let err = train_model(&[], &ModelConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTrainingSet));
    }

    #[test]
    fn test_zero_variance_target() {
        let c = Covariates::from_array([20.0, 1.0, -100.0, 0.3, 35.0]);
        let samples: Vec<GeoSample> = (0..10).map(|i| GeoSample::new(i as f64, 0.0, c)).collect();
        let err = train_model(&samples, &ModelConfig::new(5, 0.2)).unwrap_err();
        assert!(matches!(err, ModelError::ZeroVarianceTarget(_)));
    }

    #[test]
    fn test_single_sample_cannot_split() {
        let samples = corpus(1);
        let err = train_model(&samples, &ModelConfig::new(5, 0.2)).unwrap_err();
        // One label is trivially constant.
        assert!(matches!(err, ModelError::ZeroVarianceTarget(_)));
    }
}
