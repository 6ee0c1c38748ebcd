//! Coastline shapefile reader.
//!
//! Reads land polygons from a Natural Earth style land shapefile. Within a
//! shape record, outer rings become polygons and each inner ring becomes a
//! hole of the smallest outer ring that contains it, whatever the ring order.

use std::path::Path;

use geo::{Area, Coord, Intersects, LineString, Point, Polygon};
use shapefile::{PolygonRing, Reader, Shape};
use tracing::debug;

use super::LandMaskError;

/// Default location of the 1:110m Natural Earth land polygons.
pub const DEFAULT_COASTLINE_PATH: &str = "data/ne_110m_land.shp";

/// Loads all land polygons from `path`, in (lon, lat) coordinates.
pub fn load_coastline_polygons(path: &Path) -> Result<Vec<Polygon<f64>>, LandMaskError> {
    if !path.exists() {
        return Err(LandMaskError::MissingReference(path.to_path_buf()));
    }

    let mut reader = Reader::from_path(path)?;
    let mut polygons = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, _record) = result?;

        if let Shape::Polygon(polygon) = shape {
            let mut outers: Vec<LineString<f64>> = Vec::new();
            let mut inners: Vec<LineString<f64>> = Vec::new();

            for ring in polygon.rings() {
                let coords: LineString<f64> = ring
                    .points()
                    .iter()
                    .map(|p| Coord { x: p.x, y: p.y })
                    .collect();
                match ring {
                    PolygonRing::Outer(_) => outers.push(coords),
                    PolygonRing::Inner(_) => inners.push(coords),
                }
            }

            polygons.extend(assemble_rings(outers, inners));
        }
    }

    debug!(count = polygons.len(), "coastline polygons read");
    Ok(polygons)
}

/// Groups rings into polygons, giving each hole to the smallest containing
/// outer ring. Holes outside every outer ring are dropped.
fn assemble_rings(outers: Vec<LineString<f64>>, inners: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let shells: Vec<Polygon<f64>> = outers.into_iter().map(|r| Polygon::new(r, vec![])).collect();
    let areas: Vec<f64> = shells.iter().map(|p| p.unsigned_area()).collect();
    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for inner in inners {
        let Some(&probe) = inner.0.first() else {
            continue;
        };
        let probe = Point::from(probe);
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, shell)| shell.intersects(&probe))
            .min_by(|a, b| areas[a.0].total_cmp(&areas[b.0]))
            .map(|(i, _)| i);
        match owner {
            Some(i) => holes[i].push(inner),
            None => debug!("dropping inner ring outside every outer ring"),
        }
    }

    shells
        .into_iter()
        .zip(holes)
        .map(|(shell, holes)| {
            let (exterior, _) = shell.into_inner();
            Polygon::new(exterior, holes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmask::{LandMask, LandQuery};
    use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
    use shapefile::Writer;
    use tempfile::tempdir;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<shapefile::Point> {
        vec![
            shapefile::Point::new(x0, y0),
            shapefile::Point::new(x0, y1),
            shapefile::Point::new(x1, y1),
            shapefile::Point::new(x1, y0),
            shapefile::Point::new(x0, y0),
        ]
    }

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
    }

    fn write_shapefile(path: &Path, rings: Vec<PolygonRing<shapefile::Point>>) {
        let table = TableWriterBuilder::new().add_character_field("name".try_into().unwrap(), 16);
        let mut writer = Writer::from_path(path, table).unwrap();
        let mut record = Record::default();
        record.insert("name".to_string(), FieldValue::Character(Some("land".to_string())));
        writer
            .write_shape_and_record(&shapefile::Polygon::with_rings(rings), &record)
            .unwrap();
    }

    #[test]
    fn test_shapefile_polygon_with_hole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("land.shp");
        write_shapefile(
            &path,
            vec![
                PolygonRing::Outer(square(0.0, 0.0, 40.0, 40.0)),
                PolygonRing::Inner(square(10.0, 10.0, 30.0, 30.0)),
            ],
        );

        let mask = LandMask::from_shapefile(&path).unwrap();
        assert_eq!(mask.polygon_count(), 1);
        assert!(mask.is_land(5.0, 5.0));
        assert!(!mask.is_land(20.0, 20.0));
        assert!(!mask.is_land(50.0, 50.0));
    }

    #[test]
    fn test_holes_follow_containment_not_order() {
        // The lake belongs to the first shell but is listed after the second.
        let polygons = assemble_rings(
            vec![line(0.0, 0.0, 40.0, 40.0), line(100.0, 0.0, 120.0, 20.0)],
            vec![line(10.0, 10.0, 30.0, 30.0)],
        );

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert!(polygons[1].interiors().is_empty());
    }

    #[test]
    fn test_hole_goes_to_innermost_shell() {
        // An island inside a lake, with a pond on the island.
        let polygons = assemble_rings(
            vec![line(0.0, 0.0, 100.0, 100.0), line(40.0, 40.0, 60.0, 60.0)],
            vec![line(20.0, 20.0, 80.0, 80.0), line(45.0, 45.0, 55.0, 55.0)],
        );

        assert_eq!(polygons[0].interiors().len(), 1);
        assert_eq!(polygons[1].interiors().len(), 1);
        assert_eq!(polygons[1].interiors()[0], line(45.0, 45.0, 55.0, 55.0));
    }

    #[test]
    fn test_orphan_hole_is_dropped() {
        let polygons = assemble_rings(vec![line(0.0, 0.0, 10.0, 10.0)], vec![line(50.0, 50.0, 60.0, 60.0)]);
        assert_eq!(polygons.len(), 1);
        assert!(polygons[0].interiors().is_empty());
    }
}
