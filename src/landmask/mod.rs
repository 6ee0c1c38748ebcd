//! Land masking from coastline polygons.
//!
//! The mask answers a single question, "is this lat/lon over land?", using a
//! planar point-in-polygon test with longitude as x and latitude as y. All
//! land polygons of the coastline reference are held as one composite region;
//! an R-tree over polygon bounding boxes keeps per-query cost low when masking
//! large grids.
//!
//! # Example
//!
//! ```ignore
//! use sharkmap::landmask::{LandMask, LandQuery};
//!
//! let mask = LandMask::from_shapefile("data/ne_110m_land.shp")?;
//! if !mask.is_land(-33.9, 151.3) {
//!     println!("open water");
//! }
//! ```

mod coastline;

pub use coastline::{load_coastline_polygons, DEFAULT_COASTLINE_PATH};

use std::fmt;
use std::path::{Path, PathBuf};

use geo::{BoundingRect, Contains, Coord, Point, Polygon, Rect};
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use thiserror::Error;
use tracing::info;

/// Error type for land mask construction.
#[derive(Debug, Error)]
pub enum LandMaskError {
    /// The coastline reference file does not exist.
    #[error("coastline reference not found: {0}")]
    MissingReference(PathBuf),

    /// Shapefile parsing error.
    #[error("shapefile error: {0}")]
    Shapefile(String),

    /// The reference contained no usable land polygons.
    #[error("no land polygons found in {0}")]
    NoPolygons(PathBuf),
}

impl From<shapefile::Error> for LandMaskError {
    fn from(e: shapefile::Error) -> Self {
        LandMaskError::Shapefile(e.to_string())
    }
}

/// Land/ocean membership query.
///
/// Implemented by [`LandMask`]; tests substitute their own implementations
/// (for example a mask that reports land everywhere).
pub trait LandQuery: Send + Sync {
    /// Returns true when the point lies inside any land polygon.
    fn is_land(&self, lat: f64, lon: f64) -> bool;

    /// Batch variant: `true` for every `(lat, lon)` that is ocean.
    ///
    /// Points are independent, so the batch runs in parallel; the result is
    /// positionally aligned with `points`.
    fn ocean_mask(&self, points: &[(f64, f64)]) -> Vec<bool> {
        points
            .par_iter()
            .map(|&(lat, lon)| !self.is_land(lat, lon))
            .collect()
    }
}

/// Bounding box of one land polygon, keyed by its position in the mask.
#[derive(Debug, Clone)]
struct PolygonBox {
    idx: u32,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for PolygonBox {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

/// Immutable composite land region.
pub struct LandMask {
    polygons: Vec<Polygon<f64>>,
    /// Union of all polygon bounds; `None` for an empty mask.
    extent: Option<Rect<f64>>,
    /// Polygon bounding boxes in (lon, lat).
    index: RTree<PolygonBox>,
}

impl LandMask {
    /// Builds a mask from land polygons in (lon, lat) coordinates.
    ///
    /// Degenerate polygons without a bounding rectangle are dropped. An empty
    /// input yields a mask that reports ocean everywhere.
    pub fn from_polygons(polygons: Vec<Polygon<f64>>) -> Self {
        let mut kept = Vec::with_capacity(polygons.len());
        let mut bounds = Vec::with_capacity(polygons.len());

        for polygon in polygons {
            if let Some(rect) = polygon.bounding_rect() {
                kept.push(polygon);
                bounds.push(rect);
            }
        }

        let extent = bounds.iter().copied().reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        });

        let boxes = bounds
            .iter()
            .enumerate()
            .map(|(idx, rect)| PolygonBox {
                idx: idx as u32,
                env: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
            .collect();

        Self {
            polygons: kept,
            extent,
            index: RTree::bulk_load(boxes),
        }
    }

    /// Loads every land polygon from a coastline shapefile.
    ///
    /// A missing, unreadable or empty reference is fatal: without it there is
    /// no way to guarantee ocean-only output.
    pub fn from_shapefile<P: AsRef<Path>>(path: P) -> Result<Self, LandMaskError> {
        let path = path.as_ref();
        let polygons = load_coastline_polygons(path)?;
        if polygons.is_empty() {
            return Err(LandMaskError::NoPolygons(path.to_path_buf()));
        }

        let mask = Self::from_polygons(polygons);
        info!(
            polygons = mask.polygon_count(),
            path = %path.display(),
            "land mask loaded"
        );
        Ok(mask)
    }

    /// Number of land polygons.
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Returns true if the mask has no land at all.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Get statistics about the mask.
    pub fn statistics(&self) -> LandMaskStatistics {
        let total_vertices = self
            .polygons
            .iter()
            .map(|p| p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>())
            .sum();

        LandMaskStatistics {
            polygon_count: self.polygons.len(),
            total_vertices,
            extent: self.extent,
        }
    }
}

impl LandQuery for LandMask {
    fn is_land(&self, lat: f64, lon: f64) -> bool {
        let point = Point::new(lon, lat);
        self.index
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .any(|b| self.polygons[b.idx as usize].contains(&point))
    }
}

/// Statistics about a land mask.
#[derive(Debug, Clone)]
pub struct LandMaskStatistics {
    /// Number of land polygons
    pub polygon_count: usize,
    /// Total number of ring vertices
    pub total_vertices: usize,
    /// Extent of all land, if any
    pub extent: Option<Rect<f64>>,
}

impl fmt::Display for LandMaskStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Land Mask Statistics:")?;
        writeln!(f, "  Polygons: {}", self.polygon_count)?;
        writeln!(f, "  Total vertices: {}", self.total_vertices)?;
        match self.extent {
            Some(r) => write!(
                f,
                "  Extent: lon [{:.4}, {:.4}], lat [{:.4}, {:.4}]",
                r.min().x,
                r.max().x,
                r.min().y,
                r.max().y
            ),
            None => write!(f, "  Extent: (empty)"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geo::LineString;

    /// Axis-aligned rectangle polygon in (lon, lat).
    pub(crate) fn rect_polygon(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (lon0, lat0),
                (lon1, lat0),
                (lon1, lat1),
                (lon0, lat1),
                (lon0, lat0),
            ]),
            vec![],
        )
    }

    /// Two rectangular "continents" used throughout the test suite.
    pub(crate) fn toy_world() -> LandMask {
        LandMask::from_polygons(vec![
            rect_polygon(-100.0, 10.0, -60.0, 50.0),
            rect_polygon(20.0, -30.0, 50.0, 30.0),
        ])
    }

    #[test]
    fn test_point_in_polygon() {
        let mask = toy_world();
        assert!(mask.is_land(30.0, -80.0));
        assert!(mask.is_land(0.0, 35.0));
        assert!(!mask.is_land(0.0, 0.0));
        assert!(!mask.is_land(-60.0, 150.0));
    }

    #[test]
    fn test_empty_mask_is_all_ocean() {
        let mask = LandMask::from_polygons(vec![]);
        assert!(mask.is_empty());
        assert!(!mask.is_land(0.0, 0.0));
        assert!(!mask.is_land(90.0, 180.0));
    }

    #[test]
    fn test_hole_is_ocean() {
        let outer = LineString::from(vec![
            (0.0, 0.0),
            (40.0, 0.0),
            (40.0, 40.0),
            (0.0, 40.0),
            (0.0, 0.0),
        ]);
        let hole = LineString::from(vec![
            (10.0, 10.0),
            (30.0, 10.0),
            (30.0, 30.0),
            (10.0, 30.0),
            (10.0, 10.0),
        ]);
        let mask = LandMask::from_polygons(vec![Polygon::new(outer, vec![hole])]);

        assert!(mask.is_land(5.0, 5.0));
        assert!(!mask.is_land(20.0, 20.0));
    }

    #[test]
    fn test_ocean_mask_matches_point_queries() {
        let mask = toy_world();
        let points: Vec<(f64, f64)> = (-90..=90)
            .step_by(7)
            .flat_map(|lat| (-180..=180).step_by(11).map(move |lon| (lat as f64, lon as f64)))
            .collect();

        let batch = mask.ocean_mask(&points);
        assert_eq!(batch.len(), points.len());
        for (i, &(lat, lon)) in points.iter().enumerate() {
            assert_eq!(batch[i], !mask.is_land(lat, lon));
        }
    }

    #[test]
    fn test_index_agrees_with_linear_scan() {
        let mut polygons = Vec::new();
        for i in 0..12 {
            for j in 0..6 {
                let lon = -175.0 + i as f64 * 29.0;
                let lat = -80.0 + j as f64 * 27.0;
                polygons.push(rect_polygon(lon, lat, lon + 12.0 + j as f64, lat + 9.0 + i as f64));
            }
        }
        let mask = LandMask::from_polygons(polygons.clone());

        for lat in (-90..=90).step_by(3) {
            for lon in (-180..=180).step_by(4) {
                let (lat, lon) = (lat as f64 + 0.5, lon as f64 + 0.25);
                let point = Point::new(lon, lat);
                let expected = polygons.iter().any(|p| p.contains(&point));
                assert_eq!(mask.is_land(lat, lon), expected, "({lat}, {lon})");
            }
        }
    }

    #[test]
    fn test_overlapping_polygons() {
        let mask = LandMask::from_polygons(vec![
            rect_polygon(0.0, 0.0, 20.0, 20.0),
            rect_polygon(10.0, 10.0, 30.0, 30.0),
        ]);
        assert!(mask.is_land(5.0, 5.0));
        assert!(mask.is_land(15.0, 15.0));
        assert!(mask.is_land(25.0, 25.0));
        assert!(!mask.is_land(25.0, 5.0));
    }

    #[test]
    fn test_missing_shapefile_is_fatal() {
        let err = LandMask::from_shapefile("/definitely/not/here.shp").err();
        assert!(matches!(err, Some(LandMaskError::MissingReference(_))));
    }

    #[test]
    fn test_statistics() {
        let stats = toy_world().statistics();
        assert_eq!(stats.polygon_count, 2);
        assert_eq!(stats.total_vertices, 10);
        let extent = stats.extent.unwrap();
        assert_eq!(extent.min().x, -100.0);
        assert_eq!(extent.max().y, 50.0);
    }
}
