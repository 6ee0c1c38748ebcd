//! Rejection sampling of ocean-only observations.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

use super::config::{SamplerConfig, ValueRange};
use super::{Covariates, GeoSample};
use crate::landmask::LandQuery;

/// Errors raised while generating samples.
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error(
        "rejection budget exhausted: accepted {accepted}/{requested} ocean samples after {attempts} draws \
         (land mask or sampling domain is likely misconfigured)"
    )]
    Exhausted {
        requested: usize,
        accepted: usize,
        attempts: usize,
    },
    #[error("invalid covariate range for {0}")]
    InvalidRange(&'static str),
}

/// Generates `config.num_samples` ocean samples.
///
/// Locations are drawn uniformly over the full lat/lon rectangle and rejected
/// while they fall on land. Each accepted location then receives independent
/// uniform covariate draws. The total number of location draws is capped by
/// [`SamplerConfig::attempt_budget`]; overrunning it is an error rather than
/// a hang.
pub fn generate_samples<M: LandQuery + ?Sized>(
    config: &SamplerConfig,
    mask: &M,
) -> Result<Vec<GeoSample>, SamplingError> {
    let n = config.num_samples;
    if n == 0 {
        return Ok(Vec::new());
    }

    let ranges = config.ranges;
    let names = ["sea_surface_temp_c", "chlorophyll_mg_m3", "ocean_depth_m", "current_speed_m_s", "salinity_psu"];
    for (range, name) in ranges.as_array().iter().zip(names) {
        if !range.is_valid() {
            return Err(SamplingError::InvalidRange(name));
        }
    }

    let seed = config.resolved_seed();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let budget = config.attempt_budget();
    let mut samples = Vec::with_capacity(n);
    let mut attempts = 0usize;

    while samples.len() < n {
        if attempts >= budget {
            return Err(SamplingError::Exhausted {
                requested: n,
                accepted: samples.len(),
                attempts,
            });
        }
        attempts += 1;

        let lat: f64 = rng.random_range(-90.0..=90.0);
        let lon: f64 = rng.random_range(-180.0..=180.0);
        if mask.is_land(lat, lon) {
            continue;
        }

        let covariates = Covariates {
            sea_surface_temp_c: draw(&mut rng, ranges.sea_surface_temp_c),
            chlorophyll_mg_m3: draw(&mut rng, ranges.chlorophyll_mg_m3),
            ocean_depth_m: draw(&mut rng, ranges.ocean_depth_m),
            current_speed_m_s: draw(&mut rng, ranges.current_speed_m_s),
            salinity_psu: draw(&mut rng, ranges.salinity_psu),
        };
        samples.push(GeoSample::new(lat, lon, covariates));
    }

    debug!(attempts, accepted = n, seed, "rejection sampling finished");
    info!(
        samples = n,
        acceptance = n as f64 / attempts as f64,
        "generated synthetic ocean samples"
    );
    Ok(samples)
}

#[inline]
fn draw(rng: &mut ChaCha8Rng, range: ValueRange) -> f64 {
    if range.span() == 0.0 {
        return range.min;
    }
    rng.random_range(range.min..=range.max)
}
