//! Model training configuration.

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Which closed-form score the forest learns to reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingTarget {
    /// Mean of the five Gaussian/logistic optimality terms.
    #[default]
    Heuristic,
    /// Hand-weighted linear blend normalized by the corpus maximum.
    LinearBlend,
}

/// Configuration for training the presence model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Label generator for training.
    pub target: TrainingTarget,
    /// Number of trees in the ensemble.
    pub n_estimators: usize,
    /// Fraction of the corpus held out for evaluation, in (0, 1).
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub split_seed: u64,
    /// Seed for bootstrap resampling and feature subsetting.
    pub forest_seed: u64,
    /// Maximum tree depth (`None` grows until leaves are pure).
    pub max_depth: Option<usize>,
    /// Minimum rows required to split a node.
    pub min_samples_split: usize,
    /// Minimum rows in each child of a split.
    pub min_samples_leaf: usize,
    /// Features considered per split (`None` = all five).
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample per tree.
    pub bootstrap: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            target: TrainingTarget::Heuristic,
            n_estimators: 200,
            test_fraction: 0.2,
            split_seed: 42,
            forest_seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl ModelConfig {
    /// Creates a configuration with the given ensemble size and test fraction.
    pub fn new(n_estimators: usize, test_fraction: f64) -> Self {
        Self {
            n_estimators,
            test_fraction,
            ..Default::default()
        }
    }

    /// A small, shallow ensemble for quick previews.
    pub fn fast() -> Self {
        Self {
            n_estimators: 25,
            max_depth: Some(10),
            min_samples_leaf: 2,
            ..Default::default()
        }
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidConfig("n_estimators must be at least 1".into()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidConfig("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidConfig("min_samples_leaf must be at least 1".into()));
        }
        if let Some(f) = self.max_features {
            if f == 0 || f > 5 {
                return Err(ModelError::InvalidConfig(format!("max_features must be in 1..=5, got {f}")));
            }
        }
        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.n_estimators, 200);
        assert!((config.test_fraction - 0.2).abs() < 1e-12);
        assert_eq!(config.split_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(ModelConfig::new(0, 0.2).validate().is_err());
        assert!(ModelConfig::new(10, 0.0).validate().is_err());
        assert!(ModelConfig::new(10, 1.0).validate().is_err());
        assert!(ModelConfig::new(10, f64::NAN).validate().is_err());
        let config = ModelConfig {
            max_features: Some(6),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_serde_names() {
        let json = serde_json::to_string(&TrainingTarget::LinearBlend).unwrap();
        assert_eq!(json, "\"linear-blend\"");
    }
}
