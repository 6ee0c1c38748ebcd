//! Scoring grid cells and turning them into heat-map points.

mod config;

pub use config::{IntensityTransform, RenderConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::grid::{BoundingBox, GridCell};
use crate::model::PresenceScorer;
use crate::samples::{Covariates, GeoSample};
use crate::spatial::AssignedCell;

/// Errors raised while rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("threshold must be finite, got {0}")]
    InvalidThreshold(f64),
    #[error("intensity exponent must be finite and positive, got {0}")]
    InvalidGamma(f64),
    #[error("{field} must be positive, got {value}")]
    InvalidStyle { field: &'static str, value: f64 },
}

/// A grid cell with its predicted presence probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredCell {
    pub cell: GridCell,
    pub score: f64,
}

/// One weighted point of the heat layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub intensity: f64,
}

/// Scores every assigned cell, preserving order.
pub fn score_cells<S: PresenceScorer + ?Sized>(assigned: &[AssignedCell], scorer: &S) -> Vec<ScoredCell> {
    let rows: Vec<Covariates> = assigned.iter().map(|a| a.covariates).collect();
    let scores = scorer.score_batch(&rows);
    assigned
        .iter()
        .zip(scores)
        .map(|(a, score)| ScoredCell { cell: a.cell, score })
        .collect()
}

/// Keeps cells scoring at least `threshold` and maps scores to intensities.
///
/// The comparison is inclusive, so a threshold of 0 keeps every cell and
/// anything above 1 keeps none. An empty result is valid.
pub fn render_heat(
    scored: &[ScoredCell],
    threshold: f64,
    transform: IntensityTransform,
) -> Result<Vec<HeatPoint>, RenderError> {
    if !threshold.is_finite() {
        return Err(RenderError::InvalidThreshold(threshold));
    }
    transform.validate()?;

    Ok(scored
        .iter()
        .filter(|s| s.score >= threshold)
        .map(|s| HeatPoint {
            latitude: s.cell.latitude,
            longitude: s.cell.longitude,
            intensity: transform.apply(s.score),
        })
        .collect())
}

/// Everything a map exporter needs: points plus view and style settings.
#[derive(Debug, Clone, Serialize)]
pub struct HeatLayer {
    pub points: Vec<HeatPoint>,
    /// Initial view center `(lat, lon)`: the corpus mean location.
    pub center: (f64, f64),
    pub bounds: BoundingBox,
    pub threshold: f64,
    pub radius: u32,
    pub blur: u32,
    pub max_zoom: u32,
    pub zoom: u32,
}

impl HeatLayer {
    /// Assembles a layer centred on the mean sample location.
    pub fn new(points: Vec<HeatPoint>, samples: &[GeoSample], bounds: BoundingBox, config: &RenderConfig) -> Self {
        let center = if samples.is_empty() {
            bounds.center()
        } else {
            let n = samples.len() as f64;
            let lat = samples.iter().map(|s| s.latitude).sum::<f64>() / n;
            let lon = samples.iter().map(|s| s.longitude).sum::<f64>() / n;
            (lat, lon)
        };
        Self {
            points,
            center,
            bounds,
            threshold: config.threshold,
            radius: config.radius,
            blur: config.blur,
            max_zoom: config.max_zoom,
            zoom: config.initial_zoom,
        }
    }

    /// Highest intensity in the layer, 0 when empty.
    pub fn peak_intensity(&self) -> f64 {
        self.points.iter().map(|p| p.intensity).fold(0.0, f64::max)
    }
}

/// Scores, filters and packages a heat layer in one call.
pub fn render_layer<S: PresenceScorer + ?Sized>(
    assigned: &[AssignedCell],
    scorer: &S,
    samples: &[GeoSample],
    bounds: BoundingBox,
    config: &RenderConfig,
) -> Result<(Vec<ScoredCell>, HeatLayer), RenderError> {
    config.validate()?;
    let scored = score_cells(assigned, scorer);
    let points = render_heat(&scored, config.threshold, config.transform)?;
    info!(
        scorer = scorer.name(),
        scored = scored.len(),
        hotspots = points.len(),
        threshold = config.threshold,
        "heat layer rendered"
    );
    let layer = HeatLayer::new(points, samples, bounds, config);
    Ok((scored, layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(scores: &[f64]) -> Vec<ScoredCell> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ScoredCell {
                cell: GridCell {
                    latitude: i as f64,
                    longitude: -(i as f64),
                },
                score,
            })
            .collect()
    }

    #[test]
    fn test_threshold_zero_keeps_all() {
        let cells = scored(&[0.0, 0.1, 0.5, 1.0]);
        let points = render_heat(&cells, 0.0, IntensityTransform::Linear).unwrap();
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn test_threshold_above_one_keeps_none() {
        let cells = scored(&[0.0, 0.5, 1.0]);
        let points = render_heat(&cells, 1.01, IntensityTransform::Linear).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let cells = scored(&[0.39, 0.4, 0.41]);
        let points = render_heat(&cells, 0.4, IntensityTransform::Linear).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].intensity, 0.4);
        assert_eq!(points[0].latitude, 1.0);
        assert_eq!(points[0].longitude, -1.0);
    }

    #[test]
    fn test_power_transform() {
        let cells = scored(&[0.25, 1.0]);
        let points = render_heat(&cells, 0.0, IntensityTransform::Power { gamma: 0.5 }).unwrap();
        assert!((points[0].intensity - 0.5).abs() < 1e-12);
        assert_eq!(points[1].intensity, 1.0);

        assert!(render_heat(&cells, 0.0, IntensityTransform::Power { gamma: 0.0 }).is_err());
        assert!(render_heat(&cells, f64::NAN, IntensityTransform::Linear).is_err());
    }

    #[test]
    fn test_layer_centered_on_sample_mean() {
        let c = Covariates::from_array([20.0, 1.0, -10.0, 0.5, 35.0]);
        let samples = vec![GeoSample::new(10.0, 20.0, c), GeoSample::new(30.0, -40.0, c)];
        let bounds = BoundingBox {
            lat_min: 10.0,
            lat_max: 30.0,
            lon_min: -40.0,
            lon_max: 20.0,
        };
        let layer = HeatLayer::new(Vec::new(), &samples, bounds, &RenderConfig::default());
        assert_eq!(layer.center, (20.0, -10.0));
        assert_eq!(layer.radius, 8);
        assert_eq!(layer.peak_intensity(), 0.0);
    }
}
