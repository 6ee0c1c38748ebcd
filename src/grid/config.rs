//! Grid resolution configuration.

use serde::{Deserialize, Serialize};

use super::GridError;

/// Default grid resolution in degrees.
pub const DEFAULT_RESOLUTION_DEG: f64 = 0.25;

/// Lattice spacing along each axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Latitude step (degrees).
    pub lat_step: f64,
    /// Longitude step (degrees).
    pub lon_step: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::uniform(DEFAULT_RESOLUTION_DEG)
    }
}

impl GridSpec {
    /// Same step on both axes.
    pub const fn uniform(resolution: f64) -> Self {
        Self {
            lat_step: resolution,
            lon_step: resolution,
        }
    }

    /// Coarse one-degree preview grid.
    pub const fn preview() -> Self {
        Self::uniform(1.0)
    }

    /// Both steps must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), GridError> {
        for (axis, step) in [("latitude", self.lat_step), ("longitude", self.lon_step)] {
            if !(step.is_finite() && step > 0.0) {
                return Err(GridError::InvalidStep { axis, step });
            }
        }
        Ok(())
    }

    /// Number of lattice points covering `span` degrees along one axis:
    /// `ceil(span / step)`, at least 1.
    pub fn axis_count(span: f64, step: f64) -> usize {
        let n = (span / step).ceil();
        if n.is_finite() && n >= 1.0 {
            n as usize
        } else {
            1
        }
    }
}
