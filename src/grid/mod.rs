//! Regular lat/lon prediction grid over the corpus extent.
//!
//! The lattice is half-open: along each axis the points are
//! `start + i * step` for `i < ceil(span / step)`, so the maximum corpus
//! coordinate itself is generally not a grid point. A degenerate extent
//! (all samples on one latitude or longitude) still yields one point on
//! that axis.

mod config;

pub use config::{GridSpec, DEFAULT_RESOLUTION_DEG};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::landmask::LandQuery;
use crate::samples::GeoSample;

/// Upper bound on lattice size before masking.
pub const MAX_GRID_CELLS: usize = 200_000_000;

/// Errors raised while building a grid.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("{axis} step must be finite and positive, got {step}")]
    InvalidStep { axis: &'static str, step: f64 },
    #[error("cannot build a grid over an empty corpus")]
    EmptyCorpus,
    #[error("corpus coordinates are not finite")]
    NonFiniteBounds,
    #[error("grid of {lat_count} x {lon_count} cells exceeds the {max} cell limit")]
    TooLarge {
        lat_count: usize,
        lon_count: usize,
        max: usize,
    },
}

/// Axis-aligned lat/lon extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Smallest box containing every sample location.
    pub fn from_samples(samples: &[GeoSample]) -> Result<Self, GridError> {
        if samples.is_empty() {
            return Err(GridError::EmptyCorpus);
        }
        let mut bbox = Self {
            lat_min: f64::INFINITY,
            lat_max: f64::NEG_INFINITY,
            lon_min: f64::INFINITY,
            lon_max: f64::NEG_INFINITY,
        };
        for s in samples {
            bbox.lat_min = bbox.lat_min.min(s.latitude);
            bbox.lat_max = bbox.lat_max.max(s.latitude);
            bbox.lon_min = bbox.lon_min.min(s.longitude);
            bbox.lon_max = bbox.lon_max.max(s.longitude);
        }
        let corners = [bbox.lat_min, bbox.lat_max, bbox.lon_min, bbox.lon_max];
        if corners.iter().any(|v| !v.is_finite()) {
            return Err(GridError::NonFiniteBounds);
        }
        Ok(bbox)
    }

    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.lat_min + self.lat_max) / 2.0, (self.lon_min + self.lon_max) / 2.0)
    }
}

/// One grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub latitude: f64,
    pub longitude: f64,
}

/// Ocean cells of a lattice plus its dimensions.
#[derive(Debug, Clone)]
pub struct OceanGrid {
    pub bbox: BoundingBox,
    pub spec: GridSpec,
    pub lat_count: usize,
    pub lon_count: usize,
    /// Cells that survived land masking, latitude-major.
    pub cells: Vec<GridCell>,
}

impl OceanGrid {
    /// Lattice size before masking.
    pub fn total_cells(&self) -> usize {
        self.lat_count * self.lon_count
    }

    /// Cells removed by the land mask.
    pub fn land_cells(&self) -> usize {
        self.total_cells() - self.cells.len()
    }
}

/// Enumerates every lattice point of `bbox`, latitude-major.
pub fn lattice(bbox: &BoundingBox, spec: &GridSpec) -> Result<(usize, usize, Vec<GridCell>), GridError> {
    spec.validate()?;

    let lat_count = GridSpec::axis_count(bbox.lat_span(), spec.lat_step);
    let lon_count = GridSpec::axis_count(bbox.lon_span(), spec.lon_step);
    let too_large = GridError::TooLarge {
        lat_count,
        lon_count,
        max: MAX_GRID_CELLS,
    };
    match lat_count.checked_mul(lon_count) {
        Some(n) if n <= MAX_GRID_CELLS => {}
        _ => return Err(too_large),
    }

    let cells = (0..lat_count)
        .into_par_iter()
        .flat_map_iter(|i| {
            let latitude = bbox.lat_min + i as f64 * spec.lat_step;
            (0..lon_count).map(move |j| GridCell {
                latitude,
                longitude: bbox.lon_min + j as f64 * spec.lon_step,
            })
        })
        .collect();

    Ok((lat_count, lon_count, cells))
}

/// Builds the ocean grid over the corpus extent.
///
/// # Arguments
/// * `samples` - Corpus whose bounding box defines the grid extent
/// * `spec` - Lattice steps
/// * `mask` - Land mask; land cells are dropped
pub fn build_grid<M: LandQuery + ?Sized>(
    samples: &[GeoSample],
    spec: &GridSpec,
    mask: &M,
) -> Result<OceanGrid, GridError> {
    let bbox = BoundingBox::from_samples(samples)?;
    let (lat_count, lon_count, lattice) = lattice(&bbox, spec)?;
    debug!(lat_count, lon_count, ?bbox, "lattice enumerated");

    let points: Vec<(f64, f64)> = lattice.iter().map(|c| (c.latitude, c.longitude)).collect();
    let ocean = mask.ocean_mask(&points);
    let cells: Vec<GridCell> = lattice
        .into_iter()
        .zip(ocean)
        .filter_map(|(cell, is_ocean)| is_ocean.then_some(cell))
        .collect();

    let grid = OceanGrid {
        bbox,
        spec: *spec,
        lat_count,
        lon_count,
        cells,
    };
    info!(
        total = grid.total_cells(),
        ocean = grid.cells.len(),
        land = grid.land_cells(),
        "grid built"
    );
    Ok(grid)
}
