//! Nearest-sample feature assignment.
//!
//! Each grid cell takes the covariates of the closest corpus sample, measured
//! as planar distance in (lat, lon) degrees. Samples live in an R-tree keyed
//! by their corpus position; among equally distant samples the lowest
//! position wins, so results do not depend on tree layout or thread count.

use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::grid::GridCell;
use crate::samples::{Covariates, GeoSample};

/// Errors raised during feature assignment.
#[derive(Error, Debug)]
pub enum AssignError {
    #[error("no reference samples to assign features from")]
    EmptyReference,
}

/// A grid cell carrying the covariates of its nearest sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssignedCell {
    pub cell: GridCell,
    pub covariates: Covariates,
    /// Index of the donor sample in the reference slice.
    pub sample_index: usize,
}

/// A sample's (lat, lon) tagged with its corpus position.
type SamplePoint = GeomWithData<[f64; 2], usize>;

/// Nearest-neighbour lookup over a fixed set of samples.
#[derive(Debug, Clone)]
pub struct SampleIndex<'a> {
    samples: &'a [GeoSample],
    tree: RTree<SamplePoint>,
}

impl<'a> SampleIndex<'a> {
    pub fn new(samples: &'a [GeoSample]) -> Result<Self, AssignError> {
        if samples.is_empty() {
            return Err(AssignError::EmptyReference);
        }
        let points = samples
            .iter()
            .enumerate()
            .map(|(i, s)| SamplePoint::new([s.latitude, s.longitude], i))
            .collect();
        Ok(Self {
            samples,
            tree: RTree::bulk_load(points),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the sample nearest to `(lat, lon)`; ties go to the lowest index.
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<usize, AssignError> {
        let mut hits = self.tree.nearest_neighbor_iter_with_distance_2(&[lat, lon]);
        let (first, d0) = hits.next().ok_or(AssignError::EmptyReference)?;
        Ok(hits
            .take_while(|&(_, d)| d == d0)
            .map(|(p, _)| p.data)
            .fold(first.data, usize::min))
    }

    /// Assigns covariates to every cell in parallel, preserving cell order.
    pub fn assign(&self, cells: &[GridCell]) -> Result<Vec<AssignedCell>, AssignError> {
        cells
            .par_iter()
            .map(|&cell| {
                let i = self.nearest(cell.latitude, cell.longitude)?;
                Ok(AssignedCell {
                    cell,
                    covariates: self.samples[i].covariates,
                    sample_index: i,
                })
            })
            .collect()
    }
}

/// Copies the nearest sample's covariates onto each cell.
///
/// # Arguments
/// * `cells` - Grid cells to annotate
/// * `samples` - Reference corpus; must not be empty
pub fn assign_features(cells: &[GridCell], samples: &[GeoSample]) -> Result<Vec<AssignedCell>, AssignError> {
    let index = SampleIndex::new(samples)?;
    let assigned = index.assign(cells)?;
    info!(cells = assigned.len(), samples = samples.len(), "features assigned");
    Ok(assigned)
}
