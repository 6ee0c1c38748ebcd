//! Closed-form presence scores used as training targets.

use super::{ModelError, PresenceScorer};
use crate::samples::{CovariateRanges, Covariates, GeoSample};

/// Optimal sea surface temperature (°C) and tolerance.
const SST_OPT_C: f64 = 24.0;
const SST_SIGMA_C: f64 = 3.0;
/// Chlorophyll saturation scale (mg/m³).
const CHLOR_SCALE: f64 = 2.0;
/// Preferred depth value (m) and tolerance.
const DEPTH_OPT_M: f64 = 200.0;
const DEPTH_SIGMA_M: f64 = 500.0;
/// Preferred current speed (m/s) and tolerance.
const CURRENT_OPT: f64 = 0.5;
const CURRENT_SIGMA: f64 = 0.5;
/// Preferred salinity (PSU) and tolerance.
const SALINITY_OPT: f64 = 35.0;
const SALINITY_SIGMA: f64 = 2.0;

#[inline]
fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sigma * sigma)).exp()
}

#[inline]
fn bounded(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Average of five per-covariate optimality terms.
///
/// Temperature, depth, current and salinity use Gaussian bumps around a
/// preferred value; chlorophyll saturates through `tanh(c / 2)`. The depth
/// optimum sits at +200 m, so all underwater depths score on the falling
/// flank of the bump.
pub fn heuristic_score(c: &Covariates) -> f64 {
    let sst = gaussian(c.sea_surface_temp_c, SST_OPT_C, SST_SIGMA_C);
    let chlor = (c.chlorophyll_mg_m3 / CHLOR_SCALE).tanh();
    let depth = gaussian(c.ocean_depth_m, DEPTH_OPT_M, DEPTH_SIGMA_M);
    let current = gaussian(c.current_speed_m_s, CURRENT_OPT, CURRENT_SIGMA);
    let salinity = gaussian(c.salinity_psu, SALINITY_OPT, SALINITY_SIGMA);

    bounded((sst + chlor + depth + current + salinity) / 5.0)
}

/// Parameter-free heuristic scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl PresenceScorer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn score(&self, covariates: &Covariates) -> f64 {
        heuristic_score(covariates)
    }
}

/// Weights for SST, chlorophyll, depth, current and salinity desirability.
pub const BLEND_WEIGHTS: [f64; 5] = [0.30, 0.25, 0.20, 0.10, 0.15];

/// Hand-weighted linear score, normalized by the corpus maximum.
///
/// Each covariate is first mapped to a [0, 1] desirability using the
/// sampling policy ranges: warmer water, more chlorophyll, shallower depth,
/// calmer current and mid-range salinity score higher.
#[derive(Debug, Clone)]
pub struct LinearBlendScorer {
    ranges: CovariateRanges,
    weights: [f64; 5],
    scale: f64,
}

impl LinearBlendScorer {
    /// Fits the normalization constant on `samples`.
    ///
    /// Fails when the corpus is empty or the largest raw blend is not a
    /// positive finite number, since dividing by it would produce garbage.
    pub fn fit(samples: &[GeoSample], ranges: CovariateRanges, weights: [f64; 5]) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ModelError::InvalidConfig(format!("blend weights must be finite and non-negative: {weights:?}")));
        }

        let max = samples
            .iter()
            .map(|s| raw_blend(&s.covariates, &ranges, &weights))
            .fold(f64::NEG_INFINITY, f64::max);

        if !max.is_finite() || max <= 0.0 {
            return Err(ModelError::ZeroMaxScore(max));
        }

        Ok(Self {
            ranges,
            weights,
            scale: 1.0 / max,
        })
    }

    /// Unnormalized blend for `c`.
    pub fn raw(&self, c: &Covariates) -> f64 {
        raw_blend(c, &self.ranges, &self.weights)
    }
}

fn raw_blend(c: &Covariates, ranges: &CovariateRanges, weights: &[f64; 5]) -> f64 {
    let desirability = [
        ranges.sea_surface_temp_c.normalize(c.sea_surface_temp_c),
        ranges.chlorophyll_mg_m3.normalize(c.chlorophyll_mg_m3),
        ranges.ocean_depth_m.normalize(c.ocean_depth_m),
        1.0 - ranges.current_speed_m_s.normalize(c.current_speed_m_s),
        1.0 - (ranges.salinity_psu.normalize(c.salinity_psu) - 0.5).abs() * 2.0,
    ];
    desirability.iter().zip(weights).map(|(d, w)| d * w).sum()
}

impl PresenceScorer for LinearBlendScorer {
    fn name(&self) -> &str {
        "linear-blend"
    }

    fn score(&self, covariates: &Covariates) -> f64 {
        bounded(self.raw(covariates) * self.scale)
    }
}
