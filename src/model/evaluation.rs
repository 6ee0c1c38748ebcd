//! Hold-out split and regression metrics.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::ModelError;

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelMetrics {
    /// Mean squared error on the test rows.
    pub mse: f64,
    /// Coefficient of determination on the test rows.
    pub r2: f64,
    pub n_train: usize,
    pub n_test: usize,
}

impl std::fmt::Display for ModelMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Test MSE: {:.4} | R^2: {:.4} ({} train / {} test)",
            self.mse, self.r2, self.n_train, self.n_test
        )
    }
}

/// Shuffles `0..n` with a fixed seed and splits it into (train, test).
///
/// The test side holds `ceil(test_fraction * n)` indices. Both sides must be
/// non-empty.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    let insufficient = || ModelError::InsufficientData {
        samples: n,
        test_fraction,
    };
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(insufficient());
    }

    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(insufficient());
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Mean of squared differences. Zero for empty input.
pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    let n = truth.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / n as f64
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// With a constant truth vector the ratio is undefined; the score is 1.0
/// for a perfect prediction and 0.0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let n = truth.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let truth = &truth[..n];
    let mean = truth.iter().sum::<f64>() / n as f64;

    let ss_res: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean) * (t - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
