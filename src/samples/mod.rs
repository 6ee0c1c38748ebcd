//! Synthetic ocean observations.
//!
//! A [`GeoSample`] is one geolocated ocean observation carrying the five
//! environmental covariates used by the presence model. Samples are produced
//! by the rejection-sampling [`generate_samples`] and persisted as a flat CSV
//! corpus (see [`write_corpus`] / [`read_corpus`]).

mod config;
mod corpus;
mod generator;

pub use config::{CovariateRanges, SamplerConfig, ValueRange};
pub use corpus::{read_corpus, summarize, write_corpus, CorpusBounds, CorpusSummary, SampleIoError, CORPUS_COLUMNS};
pub use generator::{generate_samples, SamplingError};

use serde::{Deserialize, Serialize};

/// Number of environmental covariates per sample.
pub const FEATURE_COUNT: usize = 5;

/// Environmental covariates attached to a sample or grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariates {
    /// Sea surface temperature (°C).
    pub sea_surface_temp_c: f64,
    /// Chlorophyll-a concentration (mg/m³).
    pub chlorophyll_mg_m3: f64,
    /// Ocean depth in meters, negative below sea level.
    pub ocean_depth_m: f64,
    /// Surface current speed (m/s).
    pub current_speed_m_s: f64,
    /// Salinity (PSU).
    pub salinity_psu: f64,
}

impl Covariates {
    /// Feature vector in model order.
    #[inline]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.sea_surface_temp_c,
            self.chlorophyll_mg_m3,
            self.ocean_depth_m,
            self.current_speed_m_s,
            self.salinity_psu,
        ]
    }

    /// Builds covariates from a feature vector in model order.
    #[inline]
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            sea_surface_temp_c: values[0],
            chlorophyll_mg_m3: values[1],
            ocean_depth_m: values[2],
            current_speed_m_s: values[3],
            salinity_psu: values[4],
        }
    }
}

/// One synthetic ocean observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
    /// Environmental covariates at this location.
    pub covariates: Covariates,
}

impl GeoSample {
    pub fn new(latitude: f64, longitude: f64, covariates: Covariates) -> Self {
        Self {
            latitude,
            longitude,
            covariates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covariate_array_order() {
        let c = Covariates {
            sea_surface_temp_c: 1.0,
            chlorophyll_mg_m3: 2.0,
            ocean_depth_m: -3.0,
            current_speed_m_s: 4.0,
            salinity_psu: 5.0,
        };
        assert_eq!(c.to_array(), [1.0, 2.0, -3.0, 4.0, 5.0]);
        assert_eq!(Covariates::from_array(c.to_array()), c);
    }
}
