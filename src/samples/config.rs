//! Sampler configuration and covariate policy ranges.

use serde::{Deserialize, Serialize};

/// Closed interval used for uniform covariate draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the interval.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Maps `value` into [0, 1] relative to this range (clamped).
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Sea surface temperature range (°C).
pub const SST_RANGE_C: ValueRange = ValueRange::new(-2.0, 35.0);
/// Chlorophyll-a range (mg/m³).
pub const CHLOROPHYLL_RANGE_MG_M3: ValueRange = ValueRange::new(0.01, 30.0);
/// Ocean depth range (m, negative underwater).
pub const DEPTH_RANGE_M: ValueRange = ValueRange::new(-11000.0, -1.0);
/// Surface current speed range (m/s).
pub const CURRENT_RANGE_M_S: ValueRange = ValueRange::new(0.0, 3.0);
/// Salinity range (PSU).
pub const SALINITY_RANGE_PSU: ValueRange = ValueRange::new(30.0, 40.0);

/// Uniform draw ranges for each covariate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovariateRanges {
    pub sea_surface_temp_c: ValueRange,
    pub chlorophyll_mg_m3: ValueRange,
    pub ocean_depth_m: ValueRange,
    pub current_speed_m_s: ValueRange,
    pub salinity_psu: ValueRange,
}

impl Default for CovariateRanges {
    fn default() -> Self {
        Self {
            sea_surface_temp_c: SST_RANGE_C,
            chlorophyll_mg_m3: CHLOROPHYLL_RANGE_MG_M3,
            ocean_depth_m: DEPTH_RANGE_M,
            current_speed_m_s: CURRENT_RANGE_M_S,
            salinity_psu: SALINITY_RANGE_PSU,
        }
    }
}

impl CovariateRanges {
    /// Ranges in model feature order.
    pub fn as_array(&self) -> [ValueRange; 5] {
        [
            self.sea_surface_temp_c,
            self.chlorophyll_mg_m3,
            self.ocean_depth_m,
            self.current_speed_m_s,
            self.salinity_psu,
        ]
    }
}

/// Configuration for synthetic sample generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Number of ocean samples to produce.
    pub num_samples: usize,
    /// Random seed for reproducible generation; derived from the clock when unset.
    pub seed: Option<u64>,
    /// Rejection budget per requested sample.
    pub max_attempts_per_sample: usize,
    /// Lower bound on the total rejection budget, so small requests on
    /// mostly-land domains still get a fair number of draws.
    pub min_total_attempts: usize,
    /// Covariate draw ranges.
    pub ranges: CovariateRanges,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            seed: Some(42),
            max_attempts_per_sample: 1000,
            min_total_attempts: 10_000,
            ranges: CovariateRanges::default(),
        }
    }
}

impl SamplerConfig {
    /// Creates a configuration for `num_samples` samples with the given seed.
    pub fn with_samples(num_samples: usize, seed: u64) -> Self {
        Self {
            num_samples,
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// The configured seed, or one derived from the system clock.
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }

    /// Total number of location draws allowed before giving up.
    pub fn attempt_budget(&self) -> usize {
        self.num_samples
            .saturating_mul(self.max_attempts_per_sample)
            .max(self.min_total_attempts)
    }
}
